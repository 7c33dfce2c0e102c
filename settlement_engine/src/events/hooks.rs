use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, OperationRecordedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub operation_recorded_producer: Vec<EventProducer<OperationRecordedEvent>>,
}

impl EventProducers {
    pub async fn publish_operation_recorded(&self, event: OperationRecordedEvent) {
        for producer in &self.operation_recorded_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_operation_recorded: Option<EventHandler<OperationRecordedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_operation_recorded = hooks.on_operation_recorded.map(|f| EventHandler::new(buffer_size, f));
        Self { on_operation_recorded }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_operation_recorded {
            result.operation_recorded_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_operation_recorded {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_operation_recorded: Option<Handler<OperationRecordedEvent>>,
}

impl EventHooks {
    pub fn on_operation_recorded<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OperationRecordedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_operation_recorded = Some(Arc::new(f));
        self
    }
}
