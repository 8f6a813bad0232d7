use std::sync::Arc;

use crate::{
    adapters::handlers::{HeaderInjectionHandler, RequestIdHandler, TracingHandler},
    config::{DownstreamRoute, RequesterConfig},
    ports::{ChainError, DelegatingHandler, HandlerChainSource, HandlerFactory},
};

struct Registration {
    name: String,
    factory: HandlerFactory,
    global: bool,
}

/// Named delegating handler factories resolved per route.
///
/// Global handlers wrap every route (in registration order) unless the route
/// lists them itself; the route's own `delegating_handlers` follow in order.
#[derive(Default)]
pub struct HandlerRegistry {
    registrations: Vec<Registration>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in handlers, marking `config.global_handlers`
    /// as global in the listed order.
    pub fn from_config(config: &RequesterConfig) -> Self {
        let mut registry = Self::new();
        registry.register(TracingHandler::NAME, || Box::new(TracingHandler::new()));
        registry.register(RequestIdHandler::NAME, || Box::new(RequestIdHandler::new()));

        let headers = Arc::new(HeaderInjectionHandler::parse_headers(
            &config.request_headers,
        ));
        registry.register(HeaderInjectionHandler::NAME, move || {
            Box::new(HeaderInjectionHandler::new(Arc::clone(&headers)))
        });

        for name in &config.global_handlers {
            if !registry.mark_global(name) {
                tracing::warn!("Global handler '{}' is not registered", name);
            }
        }
        registry
    }

    /// Register (or replace) a handler. Replacing a global handler keeps it
    /// global.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn DelegatingHandler> + Send + Sync + 'static,
    {
        self.insert(name.into(), Arc::new(factory), false);
    }

    /// Register (or replace) a handler applied to every route.
    pub fn register_global<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn DelegatingHandler> + Send + Sync + 'static,
    {
        self.insert(name.into(), Arc::new(factory), true);
    }

    /// Promote an already registered handler to global. Global order follows
    /// promotion order. Returns `false` when the name is unknown.
    pub fn mark_global(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(index) => {
                let mut registration = self.registrations.remove(index);
                registration.global = true;
                self.registrations.push(registration);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.registrations.iter().map(|r| r.name.as_str()).collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.registrations.iter().position(|r| r.name == name)
    }

    /// A replaced registration keeps its position and stays global if it was.
    fn insert(&mut self, name: String, factory: HandlerFactory, global: bool) {
        match self.position(&name) {
            Some(index) => {
                tracing::debug!("Replacing delegating handler '{}'", name);
                let registration = &mut self.registrations[index];
                registration.factory = factory;
                registration.global |= global;
            }
            None => self.registrations.push(Registration {
                name,
                factory,
                global,
            }),
        }
    }
}

impl HandlerChainSource for HandlerRegistry {
    fn get(&self, route: &DownstreamRoute) -> Result<Vec<HandlerFactory>, ChainError> {
        let mut chain: Vec<HandlerFactory> = self
            .registrations
            .iter()
            .filter(|r| r.global && !route.delegating_handlers.contains(&r.name))
            .map(|r| Arc::clone(&r.factory))
            .collect();

        for name in &route.delegating_handlers {
            let index = self
                .position(name)
                .ok_or_else(|| ChainError::UnknownHandler {
                    name: name.clone(),
                    route: route.upstream_path_template.clone(),
                })?;
            chain.push(Arc::clone(&self.registrations[index].factory));
        }

        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::Body as AxumBody;
    use bytes::Bytes;
    use http::{Request, Response};

    use super::*;
    use crate::ports::{Handler, HandlerResult, InnerHandler};

    /// Appends its label to a shared log, then forwards.
    struct Tag {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        inner: InnerHandler,
    }

    #[async_trait]
    impl Handler for Tag {
        async fn send(&self, request: Request<Bytes>) -> HandlerResult {
            self.log.lock().unwrap().push(self.label);
            self.inner.send(self.label, request).await
        }
    }

    impl DelegatingHandler for Tag {
        fn set_inner(&mut self, inner: Arc<dyn Handler>) {
            self.inner.set(inner);
        }
    }

    struct Sink;

    #[async_trait]
    impl Handler for Sink {
        async fn send(&self, _request: Request<Bytes>) -> HandlerResult {
            Ok(Response::new(AxumBody::empty()))
        }
    }

    fn tag(
        registry: &mut HandlerRegistry,
        label: &'static str,
        global: bool,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) {
        let log = Arc::clone(log);
        let factory = move || -> Box<dyn DelegatingHandler> {
            Box::new(Tag {
                label,
                log: Arc::clone(&log),
                inner: InnerHandler::default(),
            })
        };
        if global {
            registry.register_global(label, factory);
        } else {
            registry.register(label, factory);
        }
    }

    /// Run one request through the resolved chain, nested outermost first.
    async fn run(chain: Vec<HandlerFactory>) {
        let mut current: Arc<dyn Handler> = Arc::new(Sink);
        for factory in chain.iter().rev() {
            let mut handler = factory();
            handler.set_inner(current);
            current = Arc::new(handler) as Arc<dyn Handler>;
        }
        current.send(Request::new(Bytes::new())).await.unwrap();
    }

    fn route(handlers: &[&str]) -> DownstreamRoute {
        DownstreamRoute {
            upstream_path_template: "/orders".to_string(),
            delegating_handlers: handlers.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_globals_then_route_handlers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        tag(&mut registry, "g1", true, &log);
        tag(&mut registry, "a", false, &log);
        tag(&mut registry, "g2", true, &log);
        tag(&mut registry, "b", false, &log);

        let chain = registry.get(&route(&["b", "a"])).unwrap();
        run(chain).await;

        assert_eq!(*log.lock().unwrap(), vec!["g1", "g2", "b", "a"]);
    }

    #[tokio::test]
    async fn test_route_positions_a_global_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        tag(&mut registry, "g1", true, &log);
        tag(&mut registry, "a", false, &log);

        let chain = registry.get(&route(&["a", "g1"])).unwrap();
        run(chain).await;

        assert_eq!(*log.lock().unwrap(), vec!["a", "g1"]);
    }

    #[tokio::test]
    async fn test_replacing_a_global_handler_keeps_it_global() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        tag(&mut registry, "g1", true, &log);
        tag(&mut registry, "a", false, &log);
        assert!(registry.mark_global("a"));

        // Re-registered through the route-level entry point
        tag(&mut registry, "g1", false, &log);
        tag(&mut registry, "a", false, &log);

        let chain = registry.get(&route(&[])).unwrap();
        assert_eq!(chain.len(), 2);
        run(chain).await;
        assert_eq!(*log.lock().unwrap(), vec!["g1", "a"]);
    }

    #[test]
    fn test_unknown_handler() {
        let registry = HandlerRegistry::new();
        let err = registry.get(&route(&["auth"])).err().unwrap();
        assert_eq!(
            err,
            ChainError::UnknownHandler {
                name: "auth".to_string(),
                route: "/orders".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_route_without_globals() {
        let registry = HandlerRegistry::new();
        assert!(registry.get(&route(&[])).unwrap().is_empty());
    }

    #[test]
    fn test_from_config_builtins_and_globals() {
        let config = RequesterConfig {
            global_handlers: vec!["request_id".to_string(), "tracing".to_string()],
            ..Default::default()
        };
        let registry = HandlerRegistry::from_config(&config);

        assert!(registry.contains("tracing"));
        assert!(registry.contains("request_id"));
        assert!(registry.contains("request_headers"));
        assert!(!registry.contains("auth"));
        assert_eq!(
            registry.names(),
            vec!["request_headers", "request_id", "tracing"]
        );
        assert_eq!(registry.get(&route(&[])).unwrap().len(), 2);
        assert_eq!(
            registry.get(&route(&["request_headers"])).unwrap().len(),
            3
        );
    }
}
