//! Canned operations for exercising the dispatch core.

use bytes::Bytes;
use uarpc::{
    OperationDescriptor, ServiceFault, ServiceRouter, StatusCode, handler_fn,
};

/// Operation identifiers used by the fixtures.
pub mod ops {
    use uarpc::OperationId;

    pub const ECHO: OperationId = OperationId::new(1001);
    pub const REVERSE: OperationId = OperationId::new(1002);
    pub const BOOM: OperationId = OperationId::new(1003);
    pub const STALL: OperationId = OperationId::new(1004);
}

/// Returns its input unchanged.
pub fn echo() -> OperationDescriptor {
    OperationDescriptor::new(ops::ECHO, "Echo", handler_fn(|request| async move {
        Ok(request.payload)
    }))
}

/// Returns its input with the bytes reversed.
pub fn reverse() -> OperationDescriptor {
    OperationDescriptor::new(ops::REVERSE, "Reverse", handler_fn(|request| async move {
        let mut bytes = request.payload.to_vec();
        bytes.reverse();
        Ok(Bytes::from(bytes))
    }))
}

/// Always faults with `BadInternalError`/"kaboom", carrying a diagnostic
/// attachment that is only returned when the caller asks for it.
pub fn boom() -> OperationDescriptor {
    OperationDescriptor::new(ops::BOOM, "Boom", handler_fn(|_| async {
        Err(ServiceFault::new(StatusCode::BadInternalError, "kaboom")
            .with_diagnostic("boom handler fired"))
    }))
}

/// Never completes. Used to leave calls in flight while the transport dies.
pub fn stall() -> OperationDescriptor {
    OperationDescriptor::new(ops::STALL, "Stall", handler_fn(|_| async {
        std::future::pending().await
    }))
}

/// A router with every fixture operation registered.
pub fn service_router() -> ServiceRouter {
    let mut router = ServiceRouter::new();
    router.register(echo()).expect("register echo");
    router.register(reverse()).expect("register reverse");
    router.register(boom()).expect("register boom");
    router.register(stall()).expect("register stall");
    router
}
