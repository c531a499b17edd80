use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    OrderCancelledEvent,
    OrderCreatedEvent,
    OrderStatusChangedEvent,
    PaymentSettledEvent,
    StockRestockedEvent,
};

type BoxedHook = Pin<Box<dyn Future<Output = ()> + Send>>;

/// The publishing side of the hooks. The APIs hold one of these and publish after their transaction has committed.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_created_producer: Vec<EventProducer<OrderCreatedEvent>>,
    pub order_status_changed_producer: Vec<EventProducer<OrderStatusChangedEvent>>,
    pub order_cancelled_producer: Vec<EventProducer<OrderCancelledEvent>>,
    pub stock_restocked_producer: Vec<EventProducer<StockRestockedEvent>>,
    pub payment_settled_producer: Vec<EventProducer<PaymentSettledEvent>>,
}

impl EventProducers {
    pub async fn publish_order_created(&self, event: &OrderCreatedEvent) {
        for emitter in &self.order_created_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_order_status_changed(&self, event: &OrderStatusChangedEvent) {
        for emitter in &self.order_status_changed_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_order_cancelled(&self, event: &OrderCancelledEvent) {
        for emitter in &self.order_cancelled_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_stock_restocked(&self, event: &StockRestockedEvent) {
        for emitter in &self.stock_restocked_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    /// Also publishes the order status change carried by the settlement, if there is one.
    pub async fn publish_payment_settled(&self, event: &PaymentSettledEvent) {
        for emitter in &self.payment_settled_producer {
            emitter.publish_event(event.clone()).await;
        }
        if let Some(change) = &event.order_change {
            self.publish_order_status_changed(change).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_created: Option<EventHandler<OrderCreatedEvent>>,
    pub on_order_status_changed: Option<EventHandler<OrderStatusChangedEvent>>,
    pub on_order_cancelled: Option<EventHandler<OrderCancelledEvent>>,
    pub on_stock_restocked: Option<EventHandler<StockRestockedEvent>>,
    pub on_payment_settled: Option<EventHandler<PaymentSettledEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        Self {
            on_order_created: hooks.on_order_created.map(|f| EventHandler::new(buffer_size, f)),
            on_order_status_changed: hooks.on_order_status_changed.map(|f| EventHandler::new(buffer_size, f)),
            on_order_cancelled: hooks.on_order_cancelled.map(|f| EventHandler::new(buffer_size, f)),
            on_stock_restocked: hooks.on_stock_restocked.map(|f| EventHandler::new(buffer_size, f)),
            on_payment_settled: hooks.on_payment_settled.map(|f| EventHandler::new(buffer_size, f)),
        }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_created {
            result.order_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_status_changed {
            result.order_status_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_cancelled {
            result.order_cancelled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_stock_restocked {
            result.stock_restocked_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payment_settled {
            result.payment_settled_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_created {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_status_changed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_cancelled {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_stock_restocked {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_payment_settled {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_created: Option<Handler<OrderCreatedEvent>>,
    pub on_order_status_changed: Option<Handler<OrderStatusChangedEvent>>,
    pub on_order_cancelled: Option<Handler<OrderCancelledEvent>>,
    pub on_stock_restocked: Option<Handler<StockRestockedEvent>>,
    pub on_payment_settled: Option<Handler<PaymentSettledEvent>>,
}

impl EventHooks {
    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_order_created = Some(Arc::new(f));
        self
    }

    pub fn on_order_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderStatusChangedEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_order_status_changed = Some(Arc::new(f));
        self
    }

    pub fn on_order_cancelled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCancelledEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_order_cancelled = Some(Arc::new(f));
        self
    }

    pub fn on_stock_restocked<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(StockRestockedEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_stock_restocked = Some(Arc::new(f));
        self
    }

    pub fn on_payment_settled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentSettledEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_payment_settled = Some(Arc::new(f));
        self
    }
}
