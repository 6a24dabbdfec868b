use serde::{Deserialize, Serialize};

use shopkeep_core::{AggregateId, DomainError, DomainResult, Entity, Money};

/// Product identifier.
///
/// Ordered so stock locks can be taken in a fixed (ascending) sequence.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for ProductId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// A product record, referenced by value when a cart line is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    id: ProductId,
    name: String,
    price: Money,
    promotional_price: Option<Money>,
    stock: i64,
}

impl Product {
    /// Build a validated product record.
    ///
    /// A promotional price that is zero or not below `price` is accepted but
    /// inactive; it is simply ignored when pricing.
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        price: Money,
        promotional_price: Option<Money>,
        stock: i64,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if !price.is_positive() {
            return Err(DomainError::validation("price must be positive"));
        }
        if promotional_price.is_some_and(|p| p.is_negative()) {
            return Err(DomainError::validation("promotional_price cannot be negative"));
        }
        if stock < 0 {
            return Err(DomainError::validation("stock cannot be negative"));
        }

        Ok(Self {
            id,
            name,
            price,
            promotional_price,
            stock,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn promotional_price(&self) -> Option<Money> {
        self.promotional_price
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    /// Same record with a fresher stock reading.
    pub fn with_stock(mut self, stock: i64) -> Self {
        self.stock = stock.max(0);
        self
    }

    /// A promotion is active when it is set, positive and strictly below `price`.
    pub fn promotion_active(&self) -> bool {
        self.promotional_price
            .is_some_and(|promo| promo.is_positive() && promo < self.price)
    }

    /// The price a new cart line snapshots: promotional if active, else list price.
    pub fn effective_unit_price(&self) -> Money {
        match self.promotional_price {
            Some(promo) if self.promotion_active() => promo,
            _ => self.price,
        }
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
