use std::time::Duration;

use crate::broker::RequestBroker;

#[derive(Clone, Debug)]
pub struct HandlerState {
    pub broker: RequestBroker,

    /// Bound on how long `POST /` and result polls may block.
    pub request_timeout: Duration,
}

impl HandlerState {
    pub fn new(broker: RequestBroker) -> Self {
        let request_timeout = broker.config().request_timeout;
        Self {
            broker,
            request_timeout,
        }
    }
}
