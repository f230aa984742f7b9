//! Vendor catalogs and product listings.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument};

use leafline_core::{EntityId, Price, ProductId, Role};

use crate::db::{EntityRepository, ProductRepository, RepositoryError};
use crate::models::{Actor, BusinessEntity, Catalog, EntityKind, Product, Vendor};
use crate::services::compliance::{ComplianceService, GateError};

/// Highest unit price a product may be listed at, in dollars.
pub const MAX_PRICE_PER_UNIT: u32 = 1_000_000;

/// A product a vendor wants to list.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub category: String,
    pub sub_category: String,
    pub is_medical: bool,
    pub price_per_unit: Price,
    pub available_units: u32,
    pub min_order_quantity: u32,
    pub max_order_quantity: u32,
    pub coa_link: String,
    pub compliance_tags: Vec<String>,
}

impl NewProduct {
    fn validate(&self) -> Result<(), CatalogError> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::Invalid("name is required".to_owned()));
        }
        if self.category.trim().is_empty() {
            return Err(CatalogError::Invalid("category is required".to_owned()));
        }
        if self.price_per_unit.amount() > Decimal::from(MAX_PRICE_PER_UNIT) {
            return Err(CatalogError::Invalid(format!(
                "pricePerUnit cannot exceed {MAX_PRICE_PER_UNIT}"
            )));
        }
        if self.min_order_quantity == 0 {
            return Err(CatalogError::Invalid(
                "minOrderQuantity must be at least 1".to_owned(),
            ));
        }
        if self.min_order_quantity > self.max_order_quantity {
            return Err(CatalogError::Invalid(
                "minOrderQuantity cannot exceed maxOrderQuantity".to_owned(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("vendor {0} not found")]
    VendorNotFound(EntityId),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("invalid product: {0}")]
    Invalid(String),

    #[error(transparent)]
    Gate(GateError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<GateError> for CatalogError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::NotFound(id) | GateError::WrongKind { id, .. } => Self::VendorNotFound(id),
            GateError::Repository(e) => Self::Repository(e),
            other @ GateError::NonCompliant { .. } => Self::Gate(other),
        }
    }
}

/// Catalog browsing, visibility, and product registration.
pub struct CatalogService<'a> {
    entities: EntityRepository<'a>,
    products: ProductRepository<'a>,
    compliance: ComplianceService<'a>,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(
        entities: EntityRepository<'a>,
        products: ProductRepository<'a>,
        compliance: ComplianceService<'a>,
    ) -> Self {
        Self {
            entities,
            products,
            compliance,
        }
    }

    /// A vendor's catalog, optionally filtered by category.
    ///
    /// Unless the viewer acts for the vendor, the catalog is empty while the
    /// menu is disabled or the vendor is not compliant.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::VendorNotFound` if no vendor has this id.
    pub async fn catalog(
        &self,
        vendor_id: EntityId,
        category: Option<&str>,
        viewer: Option<&Actor>,
    ) -> Result<Catalog, CatalogError> {
        let entity = self.vendor(vendor_id).await?;
        let owner = viewer.is_some_and(|a| a.acts_for(vendor_id));
        let listed = entity
            .as_vendor()
            .is_some_and(|v| v.menu_enabled && entity.is_compliant(Utc::now()));

        if !owner && !listed {
            return Ok(Catalog::hidden(vendor_id));
        }

        let products = self.products.list_by_vendor(vendor_id).await?;
        Ok(Catalog::build(vendor_id, products, category))
    }

    /// Turn a vendor's menu on or off.
    ///
    /// Enabling requires the vendor to pass the compliance check.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Forbidden` if the actor does not act for the vendor
    /// - `CatalogError::Gate` if enabling a non-compliant vendor
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn set_visibility(
        &self,
        actor: &Actor,
        vendor_id: EntityId,
        menu_enabled: bool,
    ) -> Result<Vendor, CatalogError> {
        if !actor.acts_for(vendor_id) {
            return Err(CatalogError::Forbidden(
                "Only the vendor can change its catalog visibility.",
            ));
        }

        let entity = if menu_enabled {
            self.compliance
                .ensure_entity_active(vendor_id, Some(EntityKind::Vendor), Utc::now())
                .await?
        } else {
            self.vendor(vendor_id).await?
        };

        let BusinessEntity::Vendor(mut vendor) = entity else {
            return Err(CatalogError::VendorNotFound(vendor_id));
        };
        vendor.menu_enabled = menu_enabled;
        vendor.profile.updated_at = Utc::now();
        self.entities
            .update(&BusinessEntity::Vendor(vendor.clone()))
            .await?;

        info!("Catalog visibility updated");
        Ok(vendor)
    }

    /// List a new product in a vendor's catalog.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Forbidden` if the actor is not a vendor user for this vendor
    /// - `CatalogError::Invalid` if the product fails validation
    /// - `CatalogError::Gate` if the vendor is not compliant
    #[instrument(skip(self, actor, product), fields(user_id = %actor.user_id))]
    pub async fn add_product(
        &self,
        actor: &Actor,
        vendor_id: EntityId,
        product: NewProduct,
    ) -> Result<Product, CatalogError> {
        if actor.role != Role::Vendor || actor.entity_id != Some(vendor_id) {
            return Err(CatalogError::Forbidden(
                "Only the vendor's own users can add products.",
            ));
        }
        product.validate()?;

        let now = Utc::now();
        self.compliance
            .ensure_entity_active(vendor_id, Some(EntityKind::Vendor), now)
            .await?;

        let product = Product {
            id: ProductId::generate(),
            vendor_id,
            name: product.name.trim().to_owned(),
            description: product.description,
            category: product.category.trim().to_owned(),
            sub_category: product.sub_category,
            is_medical: product.is_medical,
            price_per_unit: product.price_per_unit,
            available_units: product.available_units,
            min_order_quantity: product.min_order_quantity,
            max_order_quantity: product.max_order_quantity,
            coa_link: product.coa_link,
            compliance_tags: product.compliance_tags,
            updated_at: now,
        };
        self.products.create(&product).await?;

        info!(product_id = %product.id, "Product listed");
        Ok(product)
    }

    async fn vendor(&self, vendor_id: EntityId) -> Result<BusinessEntity, CatalogError> {
        self.entities
            .get(vendor_id)
            .await?
            .filter(|e| e.kind() == EntityKind::Vendor)
            .ok_or(CatalogError::VendorNotFound(vendor_id))
    }
}
