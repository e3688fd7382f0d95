use super::instance::Related;

/// How many related instances a relationship yields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// Which side of the join carries the referencing column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Association {
    /// The owner holds the foreign key column
    BelongsTo,
    /// The target holds the foreign key column, at most one row
    HasOne,
    /// The target holds the foreign key column, any number of rows
    HasMany,
}

impl Association {
    pub fn cardinality(&self) -> Cardinality {
        match self {
            Association::BelongsTo | Association::HasOne => Cardinality::One,
            Association::HasMany => Cardinality::Many,
        }
    }
}

/// Relationship as the caller declares it, before key defaults are applied
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipDeclaration {
    pub name: String,
    pub association: Association,
    pub target: String,
    pub source_key: Option<String>,
    pub foreign_key: Option<String>,
}

impl RelationshipDeclaration {
    pub fn new(name: impl Into<String>, association: Association, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            association,
            target: target.into(),
            source_key: None,
            foreign_key: None,
        }
    }

    pub fn belongs_to(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, Association::BelongsTo, target)
    }

    pub fn has_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, Association::HasOne, target)
    }

    pub fn has_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, Association::HasMany, target)
    }

    /// Field on the owning entity used for matching
    pub fn source_key(mut self, field: impl Into<String>) -> Self {
        self.source_key = Some(field.into());
        self
    }

    /// Field on the target entity used for matching
    pub fn foreign_key(mut self, field: impl Into<String>) -> Self {
        self.foreign_key = Some(field.into());
        self
    }
}

/// A declared relationship with both join keys resolved
///
/// Relationships are lazy: nothing resolves them until a load names them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub name: String,
    pub association: Association,
    pub owner: String,
    pub target: String,
    /// Field on `owner`
    pub source_key: String,
    /// Field on `target`
    pub foreign_key: String,
    /// The referenced side is unique, so the reference is checked on write
    pub enforced: bool,
}

impl Relationship {
    pub fn cardinality(&self) -> Cardinality {
        self.association.cardinality()
    }

    /// The resolved value when the source key is null
    pub fn empty(&self) -> Related {
        match self.cardinality() {
            Cardinality::One => Related::None,
            Cardinality::Many => Related::Many(Vec::new()),
        }
    }

    /// The write-time reference this relationship implies, if enforced
    pub fn reference(&self) -> Option<Reference> {
        if !self.enforced {
            return None;
        }
        let reference = match self.association {
            Association::BelongsTo => Reference {
                from_entity: self.owner.clone(),
                from_field: self.source_key.clone(),
                to_entity: self.target.clone(),
                to_field: self.foreign_key.clone(),
            },
            Association::HasOne | Association::HasMany => Reference {
                from_entity: self.target.clone(),
                from_field: self.foreign_key.clone(),
                to_entity: self.owner.clone(),
                to_field: self.source_key.clone(),
            },
        };
        Some(reference)
    }
}

/// `from_entity.from_field` must name an existing `to_entity.to_field`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reference {
    pub from_entity: String,
    pub from_field: String,
    pub to_entity: String,
    pub to_field: String,
}
