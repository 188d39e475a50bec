//! Declaration step definitions.

use std::sync::Arc;
use std::time::Duration;

use cucumber::{given, then, when, World};
use serde_json::Value;
use validated_method::advice::{traced, with_cache_ttl};
use validated_method::{
    schema_mixin, ApplyOptions, ConfigError, LocalConnection, MemoryCache, Method, MethodConfig,
    Mixin,
};

/// Test context for declaration scenarios.
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct DeclarationWorld {
    connection: Arc<LocalConnection>,
    config: Option<MethodConfig>,
    built: Vec<Method>,
    error: Option<ConfigError>,
}

impl DeclarationWorld {
    fn new() -> Self {
        Self {
            connection: Arc::new(LocalConnection::new()),
            config: None,
            built: Vec::new(),
            error: None,
        }
    }

    fn declare(&mut self, name: String) {
        self.config = Some(
            MethodConfig::new(name)
                .connection(self.connection.clone())
                .cache(Arc::new(MemoryCache::new()))
                .no_validation()
                .run(|_, _| Ok(Value::from("result"))),
        );
    }

    fn config_mut(&mut self) -> &mut MethodConfig {
        self.config.as_mut().expect("no declaration")
    }

    fn update(&mut self, f: impl FnOnce(MethodConfig) -> MethodConfig) {
        let config = self.config.take().expect("no declaration");
        self.config = Some(f(config));
    }

    fn method(&self) -> &Method {
        self.built.last().expect("no method was built")
    }

    fn error(&self) -> &ConfigError {
        self.error.as_ref().expect("construction did not fail")
    }
}

// --- Given steps ---

#[given(regex = r#"^a declaration "([^"]+)"$"#)]
async fn given_declaration(world: &mut DeclarationWorld, name: String) {
    world.declare(name);
}

#[given(regex = r#"^a declaration "([^"]+)" without a validator$"#)]
async fn given_declaration_without_validator(world: &mut DeclarationWorld, name: String) {
    world.declare(name);
    world.config_mut().validate = None;
}

#[given(regex = r#"^a declaration "([^"]+)" without a body$"#)]
async fn given_declaration_without_body(world: &mut DeclarationWorld, name: String) {
    world.declare(name);
    world.config_mut().run = None;
}

#[given(regex = r#"^the mixin "([^"]+)" that returns nothing$"#)]
async fn given_named_faulty_mixin(world: &mut DeclarationWorld, name: String) {
    world.update(|config| config.mixin(Mixin::named(name, |_| None)));
}

#[given("an identity mixin")]
async fn given_identity_mixin(world: &mut DeclarationWorld) {
    world.update(|config| config.mixin(Mixin::identity()));
}

#[given("an anonymous mixin that returns nothing")]
async fn given_anonymous_faulty_mixin(world: &mut DeclarationWorld) {
    world.update(|config| config.mixin(Mixin::anonymous(|_| None)));
}

#[given("the schema mixin")]
async fn given_schema_mixin(world: &mut DeclarationWorld) {
    world.update(|config| config.mixin(schema_mixin()));
}

#[given("the tracing mixin")]
async fn given_tracing_mixin(world: &mut DeclarationWorld) {
    world.update(|config| config.mixin(traced()));
}

#[given(regex = r"^a mixin that sets the cache TTL to (\d+) milliseconds$")]
async fn given_ttl_mixin(world: &mut DeclarationWorld, ms: u64) {
    world.update(|config| config.mixin(with_cache_ttl(Duration::from_millis(ms))));
}

#[given(regex = r#"^the transport option "([^"]+)" set to (true|false)$"#)]
async fn given_transport_option(world: &mut DeclarationWorld, key: String, value: bool) {
    world.update(|config| config.apply_options(ApplyOptions::new().with(key, Value::Bool(value))));
}

// --- When steps ---

#[when("I build the method")]
async fn when_build(world: &mut DeclarationWorld) {
    let config = world.config.clone().expect("no declaration");
    match Method::new(config) {
        Ok(method) => world.built.push(method),
        Err(e) => world.error = Some(e),
    }
}

// --- Then steps ---

#[then(regex = r#"^construction fails with "(.+)"$"#)]
async fn then_fails_with(world: &mut DeclarationWorld, message: String) {
    assert_eq!(world.error().to_string(), message);
}

#[then(regex = r#"^construction fails mentioning "(.+)"$"#)]
async fn then_fails_mentioning(world: &mut DeclarationWorld, fragment: String) {
    let message = world.error().to_string();
    assert!(
        message.contains(&fragment),
        "expected '{message}' to mention '{fragment}'"
    );
}

#[then("no method is registered")]
async fn then_nothing_registered(world: &mut DeclarationWorld) {
    assert!(world.connection.method_names().is_empty());
}

#[then(regex = r#"^the method is registered as "([^"]+)"$"#)]
async fn then_registered(world: &mut DeclarationWorld, name: String) {
    assert_eq!(world.method().name(), name);
    assert!(world.connection.is_registered(&name));
}

#[then(regex = r#"^the transport option "([^"]+)" is (true|false)$"#)]
async fn then_transport_option(world: &mut DeclarationWorld, key: String, value: bool) {
    assert_eq!(world.method().apply_options().flag(&key), value);
}

#[then(regex = r"^the method caches results for (\d+) milliseconds$")]
async fn then_caches_for(world: &mut DeclarationWorld, ms: u64) {
    assert_eq!(world.method().cache_ttl(), Some(Duration::from_millis(ms)));
}
