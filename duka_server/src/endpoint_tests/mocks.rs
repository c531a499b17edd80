use async_trait::async_trait;
use duka_engine::{
    db_types::{NewUser, PaymentMethod, ProviderCorrelation, User},
    traits::{CallbackAck, CallbackResult, GatewayError, InitiateRequest, PaymentGateway, ShopError, UserManagement},
};
use mockall::mock;
use serde_json::Value;

mock! {
    pub UserManager {}
    impl UserManagement for UserManager {
        async fn insert_user(&self, user: NewUser) -> Result<User, ShopError>;
        async fn fetch_user(&self, id: i64) -> Result<Option<User>, ShopError>;
        async fn fetch_user_by_username(&self, username: &str) -> Result<Option<User>, ShopError>;
        async fn delete_user(&self, id: i64) -> Result<bool, ShopError>;
    }
    impl Clone for UserManager {
        fn clone(&self) -> Self;
    }
}

mock! {
    pub Gateway {}
    #[async_trait]
    impl PaymentGateway for Gateway {
        fn method(&self) -> PaymentMethod;
        fn normalize_phone(&self, phone: &str) -> Result<String, GatewayError>;
        async fn initiate(&self, request: &InitiateRequest) -> Result<ProviderCorrelation, GatewayError>;
        fn describe_callback(&self, raw: &Value) -> Result<CallbackResult, GatewayError>;
        fn acknowledge(&self, ack: &CallbackAck) -> Value;
    }
}
