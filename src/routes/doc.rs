use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    domain::{
        cart::CartLine,
        catalog::{BulkPack, ProductType},
        checkout::{OrderSource, ShippingAddress},
        handoff::WhatsappHandoff,
        lifecycle::{DeliveryStatus, OrderStatus},
        pricing::{CheckoutQuote, DiscountType},
    },
    dto::{
        auth::RoleCheck,
        cart::{AddToCartRequest, CartQuote, CartView, UpdateQuantityRequest},
        offers::{CreateOfferRequest, OfferList, UpdateOfferRequest},
        orders::{
            CheckoutRequest, CheckoutResponse, ManualOrderLine, ManualOrderRequest, OrderList,
            OrderWithItems, UpdateDeliveryRequest, UpdateOrderStatusRequest,
        },
        products::{CreateProductRequest, ProductCard, ProductList, UpdateProductRequest},
        tracking::{TrackingItem, TrackingItemList, TrackingSummary},
    },
    models::{Offer, Order, OrderItem, Product},
    response::{ApiResponse, Meta},
    routes::{
        admin, auth, cart, health, orders, params, products as product_routes, tracking,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::check_role,
        product_routes::list_products,
        product_routes::get_product,
        cart::get_cart,
        cart::add_to_cart,
        cart::update_quantity,
        cart::remove_item,
        cart::clear_cart,
        cart::quote_cart,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        tracking::track_order,
        tracking::track_order_items,
        admin::list_all_orders,
        admin::create_manual_order,
        admin::get_order_admin,
        admin::update_delivery_status,
        admin::update_order_status,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::list_offers,
        admin::create_offer,
        admin::update_offer,
        admin::delete_offer
    ),
    components(
        schemas(
            Product,
            ProductType,
            BulkPack,
            ProductCard,
            ProductList,
            CreateProductRequest,
            UpdateProductRequest,
            CartLine,
            CartView,
            CartQuote,
            AddToCartRequest,
            UpdateQuantityRequest,
            CheckoutQuote,
            ShippingAddress,
            OrderSource,
            Order,
            OrderItem,
            OrderStatus,
            DeliveryStatus,
            OrderList,
            OrderWithItems,
            CheckoutRequest,
            CheckoutResponse,
            WhatsappHandoff,
            UpdateDeliveryRequest,
            UpdateOrderStatusRequest,
            ManualOrderLine,
            ManualOrderRequest,
            TrackingSummary,
            TrackingItem,
            TrackingItemList,
            Offer,
            DiscountType,
            OfferList,
            CreateOfferRequest,
            UpdateOfferRequest,
            RoleCheck,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<CheckoutResponse>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<TrackingSummary>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Checkout and order history"),
        (name = "Tracking", description = "Anonymous order tracking by token"),
        (name = "Admin", description = "Staff console endpoints"),
        (name = "Auth", description = "Role checks for the signed-in user"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
