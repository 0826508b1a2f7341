pub mod application;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::cart_service::CartService;
use application::order_service::OrderService;
use application::payment_service::PaymentService;
use infrastructure::cart_repo::DieselCartRepository;
use infrastructure::order_repo::DieselOrderRepository;
use infrastructure::payment_repo::DieselPaymentRepository;

pub use application::settings::Settings;
pub use db::{create_pool, DbPool};

pub type AppCartService = CartService<DieselCartRepository>;
pub type AppOrderService = OrderService<DieselOrderRepository>;
pub type AppPaymentService = PaymentService<DieselPaymentRepository>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::cart::get_cart,
        handlers::cart::add_cart_item,
        handlers::cart::update_cart_item,
        handlers::cart::remove_cart_item,
        handlers::cart::clear_cart,
        handlers::orders::checkout,
        handlers::orders::get_order,
        handlers::orders::list_orders,
        handlers::orders::cancel_order,
        handlers::orders::update_order_status,
        handlers::orders::recalculate_order,
        handlers::payments::initiate_payment,
        handlers::payments::record_payment_event,
    ),
    components(schemas(
        handlers::cart::AddCartItemRequest,
        handlers::cart::UpdateCartItemRequest,
        handlers::cart::CartItemResponse,
        handlers::cart::CartResponse,
        handlers::orders::CheckoutRequest,
        handlers::orders::UpdateOrderStatusRequest,
        handlers::orders::OrderItemResponse,
        handlers::orders::OrderResponse,
        handlers::orders::ListOrdersResponse,
        handlers::payments::InitiatePaymentRequest,
        handlers::payments::PaymentEventRequest,
        handlers::payments::PaymentResponse,
    ))
)]
pub struct ApiDoc;

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    host: &str,
    port: u16,
    settings: Settings,
) -> std::io::Result<actix_web::dev::Server> {
    let cart_service = web::Data::new(CartService::new(DieselCartRepository::new(pool.clone())));
    let order_service = web::Data::new(OrderService::new(
        DieselOrderRepository::new(pool.clone(), settings.checkout_lock_timeout_ms),
        settings.clone(),
    ));
    let payment_service = web::Data::new(PaymentService::new(DieselPaymentRepository::new(
        pool.clone(),
        settings.checkout_lock_timeout_ms,
    )));

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(cart_service.clone())
            .app_data(order_service.clone())
            .app_data(payment_service.clone())
            .wrap(Logger::default())
            .service(
                web::scope("/carts")
                    .route("/{user_id}", web::get().to(handlers::cart::get_cart))
                    .route("/{user_id}", web::delete().to(handlers::cart::clear_cart))
                    .route(
                        "/{user_id}/items",
                        web::post().to(handlers::cart::add_cart_item),
                    )
                    .route(
                        "/{user_id}/items/{product_id}",
                        web::put().to(handlers::cart::update_cart_item),
                    )
                    .route(
                        "/{user_id}/items/{product_id}",
                        web::delete().to(handlers::cart::remove_cart_item),
                    ),
            )
            .route("/checkout", web::post().to(handlers::orders::checkout))
            .service(
                web::scope("/orders")
                    .route("", web::get().to(handlers::orders::list_orders))
                    .route("/{id}", web::get().to(handlers::orders::get_order))
                    .route("/{id}/cancel", web::post().to(handlers::orders::cancel_order))
                    .route(
                        "/{id}/status",
                        web::patch().to(handlers::orders::update_order_status),
                    )
                    .route(
                        "/{id}/recalculate",
                        web::post().to(handlers::orders::recalculate_order),
                    )
                    .route(
                        "/{id}/payment",
                        web::post().to(handlers::payments::initiate_payment),
                    )
                    .route(
                        "/{id}/payment/events",
                        web::post().to(handlers::payments::record_payment_event),
                    ),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
