//! Relationship configuration.
//!
//! Relations are declared as explicit configuration structs at model
//! registration time: every join key is spelled out, and the registry checks
//! at build time that the related model exists. Nothing is inferred from
//! field or model naming at call time.

/// A relation declared on a model.
#[derive(Debug, Clone)]
pub enum Relation {
    BelongsTo(BelongsTo),
    HasManyThrough(HasManyThrough),
}

impl Relation {
    /// Name of the related model the relation resolves to.
    pub fn related(&self) -> &str {
        match self {
            Self::BelongsTo(rel) => &rel.related,
            Self::HasManyThrough(rel) => &rel.related,
        }
    }
}

/// A child-to-owner relation: the local record carries a foreign key that is
/// matched against `owner_key` on the related model's table.
///
/// # Examples
///
/// ```
/// use facund_orm::relations::BelongsTo;
///
/// // article.user_id -> user.id
/// let rel = BelongsTo::new("user", "user_id", "id");
/// assert_eq!(rel.related, "user");
/// ```
#[derive(Debug, Clone)]
pub struct BelongsTo {
    /// Registered name of the owning model.
    pub related: String,
    /// Field on the local record holding the owner's key.
    pub foreign_key: String,
    /// Field on the related table the foreign key points at.
    pub owner_key: String,
}

impl BelongsTo {
    pub fn new(
        related: impl Into<String>,
        foreign_key: impl Into<String>,
        owner_key: impl Into<String>,
    ) -> Self {
        Self {
            related: related.into(),
            foreign_key: foreign_key.into(),
            owner_key: owner_key.into(),
        }
    }
}

/// A relation that reaches related records through an intermediate table:
/// rows of `through` whose `first_key` matches the local record's `local_key`
/// select the related rows whose `second_key` matches the through rows'
/// `through_local_key`.
///
/// The intermediate table is addressed by table name and does not need to
/// be a registered model.
///
/// # Examples
///
/// ```
/// use facund_orm::relations::HasManyThrough;
///
/// // business.id <- goods.business_id, goods.id <- orders.goods_id
/// let rel = HasManyThrough::new("order", "goods", "business_id", "goods_id");
/// assert_eq!(rel.local_key, "id");
/// assert_eq!(rel.through_local_key, "id");
/// ```
#[derive(Debug, Clone)]
pub struct HasManyThrough {
    /// Registered name of the related model.
    pub related: String,
    /// Intermediate table name.
    pub through: String,
    /// Field on the intermediate table referencing the local record.
    pub first_key: String,
    /// Field on the related table referencing the intermediate row.
    pub second_key: String,
    /// Field on the local record the intermediate table points at.
    pub local_key: String,
    /// Field on the intermediate table the related table points at.
    pub through_local_key: String,
}

impl HasManyThrough {
    pub fn new(
        related: impl Into<String>,
        through: impl Into<String>,
        first_key: impl Into<String>,
        second_key: impl Into<String>,
    ) -> Self {
        Self {
            related: related.into(),
            through: through.into(),
            first_key: first_key.into(),
            second_key: second_key.into(),
            local_key: "id".to_string(),
            through_local_key: "id".to_string(),
        }
    }

    pub fn local_key(mut self, key: impl Into<String>) -> Self {
        self.local_key = key.into();
        self
    }

    pub fn through_local_key(mut self, key: impl Into<String>) -> Self {
        self.through_local_key = key.into();
        self
    }
}
