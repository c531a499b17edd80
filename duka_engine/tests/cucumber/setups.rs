use cucumber::given;
use duka_engine::{
    db_types::{Money, NewProduct, NewUser, NewVariant, ProviderCorrelation, Role},
    traits::GatewayError,
    CatalogManagement,
    UserManagement,
};

use crate::cucumber::{world::ShopSystem, ShopWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut ShopWorld) {
    let system = ShopSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "a customer named {word}")]
async fn customer(world: &mut ShopWorld, name: String) {
    add_user(world, name, Role::Customer).await;
}

#[given(expr = "a staff member named {word}")]
async fn staff(world: &mut ShopWorld, name: String) {
    add_user(world, name, Role::Staff).await;
}

async fn add_user(world: &mut ShopWorld, name: String, role: Role) {
    let user = world.system().db.insert_user(NewUser::new(name.as_str(), role)).await.expect("Error adding user");
    world.users.insert(name, user);
}

#[given(expr = "a product {string} with variant {string} priced at {word} with {int} in stock")]
async fn product_with_variant(world: &mut ShopWorld, product: String, variant: String, price: String, stock: i64) {
    let db = &world.system().db;
    let product = db.insert_product(NewProduct::new(product)).await.expect("Error adding product");
    let price = price.parse::<Money>().expect("Invalid price");
    let new_variant = NewVariant { product_id: product.id, size: Some(variant.clone()), price, stock };
    let v = db.insert_variant(new_variant).await.expect("Error adding variant");
    world.variants.insert(variant, v.id);
}

#[given(expr = "M-Pesa will accept the next charge with checkout id {string}")]
async fn mpesa_accepts(world: &mut ShopWorld, checkout_id: String) {
    let merchant_request_id = format!("mr_{checkout_id}");
    let correlation = ProviderCorrelation::Mpesa { merchant_request_id, checkout_request_id: checkout_id };
    world.system().mpesa.push_response(Ok(correlation));
}

#[given("M-Pesa is unavailable")]
async fn mpesa_unavailable(world: &mut ShopWorld) {
    let err = GatewayError::Unavailable("operation timed out".into());
    world.system().mpesa.push_response(Err(err));
}

#[given(expr = "M-Pesa rejects the next charge with {string}")]
async fn mpesa_rejects(world: &mut ShopWorld, reason: String) {
    world.system().mpesa.push_response(Err(GatewayError::Rejected(reason)));
}
