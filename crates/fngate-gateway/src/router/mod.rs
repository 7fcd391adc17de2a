//! Gateway routing: the [`RouteTable`] and its installation into axum.

mod handler;
mod table;

pub use handler::{HttpRequest, render};
pub use table::{RouteEntry, RouteTable};

use crate::invoker::HandlerInvoker;
use axum::{
    Router,
    http::Method,
    routing::{MethodFilter, on},
};
use fngate_kernel::HttpMethod;
use std::sync::Arc;

const ANY_METHOD: MethodFilter = MethodFilter::GET
    .or(MethodFilter::POST)
    .or(MethodFilter::PUT)
    .or(MethodFilter::PATCH)
    .or(MethodFilter::DELETE)
    .or(MethodFilter::HEAD)
    .or(MethodFilter::OPTIONS);

fn method_filter(method: HttpMethod) -> MethodFilter {
    match method {
        HttpMethod::Get => MethodFilter::GET,
        HttpMethod::Post => MethodFilter::POST,
        HttpMethod::Put => MethodFilter::PUT,
        HttpMethod::Patch => MethodFilter::PATCH,
        HttpMethod::Delete => MethodFilter::DELETE,
        HttpMethod::Head => MethodFilter::HEAD,
        HttpMethod::Options => MethodFilter::OPTIONS,
        HttpMethod::Any => ANY_METHOD,
    }
}

impl RouteTable {
    /// Install one method route per entry; each route's closure owns its
    /// [`RouteEntry`].
    pub fn into_router(self, invoker: Arc<HandlerInvoker>) -> Router {
        self.entries()
            .iter()
            .fold(Router::new(), |router, entry| {
                let route = Arc::clone(entry);
                let invoker = Arc::clone(&invoker);
                router.route(
                    entry.matchable_path(),
                    on(
                        method_filter(entry.method()),
                        move |method: Method, request: HttpRequest| {
                            handler::dispatch(route, invoker, method, request)
                        },
                    ),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_method_maps_to_a_filter() {
        let singles = [
            (HttpMethod::Get, MethodFilter::GET),
            (HttpMethod::Post, MethodFilter::POST),
            (HttpMethod::Put, MethodFilter::PUT),
            (HttpMethod::Patch, MethodFilter::PATCH),
            (HttpMethod::Delete, MethodFilter::DELETE),
            (HttpMethod::Head, MethodFilter::HEAD),
            (HttpMethod::Options, MethodFilter::OPTIONS),
        ];
        let mut any = singles[0].1;
        for (method, filter) in singles {
            assert_eq!(method_filter(method), filter, "{method}");
            any = any.or(filter);
        }
        assert_eq!(method_filter(HttpMethod::Any), any);
    }
}
