//! Invocation and caching step definitions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cucumber::{given, then, when, World};
use serde_json::Value;
use validated_method::{
    schema_mixin, BoxError, ExecutionContext, FieldType, LocalConnection, MemoryCache, Method,
    MethodConfig, MethodError, MethodResult, Schema,
};

/// Test context for invocation scenarios.
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct InvocationWorld {
    connection: Arc<LocalConnection>,
    cache: Arc<MemoryCache>,
    method: Option<Method>,
    runs: Arc<AtomicUsize>,
    validations: Arc<AtomicUsize>,
    outcome: Option<MethodResult>,
}

impl InvocationWorld {
    fn new() -> Self {
        Self {
            connection: Arc::new(LocalConnection::new()),
            cache: Arc::new(MemoryCache::new()),
            method: None,
            runs: Arc::new(AtomicUsize::new(0)),
            validations: Arc::new(AtomicUsize::new(0)),
            outcome: None,
        }
    }

    /// Declaration bound to this scenario's connection and cache.
    fn declaration(&mut self, name: &str) -> MethodConfig {
        self.runs.store(0, Ordering::SeqCst);
        self.validations.store(0, Ordering::SeqCst);
        MethodConfig::new(name)
            .connection(self.connection.clone())
            .cache(self.cache.clone())
    }

    fn build(&mut self, config: MethodConfig) {
        self.method = Some(Method::new(config).expect("method should build"));
    }

    fn method(&self) -> &Method {
        self.method.as_ref().expect("no method declared")
    }

    fn returning(
        &self,
        value: Value,
    ) -> impl Fn(&ExecutionContext, &Value) -> Result<Value, BoxError> + Send + Sync + 'static {
        let runs = self.runs.clone();
        move |_: &ExecutionContext, _: &Value| -> Result<Value, BoxError> {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(value.clone())
        }
    }

    fn failing(
        &self,
        message: String,
    ) -> impl Fn(&ExecutionContext, &Value) -> Result<Value, BoxError> + Send + Sync + 'static {
        let runs = self.runs.clone();
        move |_: &ExecutionContext, _: &Value| -> Result<Value, BoxError> {
            runs.fetch_add(1, Ordering::SeqCst);
            Err(message.clone().into())
        }
    }

    fn call(&mut self, args: Value) {
        let slot: Arc<Mutex<Option<MethodResult>>> = Arc::new(Mutex::new(None));
        let writer = slot.clone();
        self.method().call(args, move |result: MethodResult| {
            *writer.lock().unwrap() = Some(result);
        });
        self.outcome = slot.lock().unwrap().take();
    }

    fn outcome(&self) -> &MethodResult {
        self.outcome.as_ref().expect("no outcome recorded")
    }
}

fn parse(json: &str) -> Value {
    serde_json::from_str(json).expect("step argument should be JSON")
}

fn int_and_string(int: &str, string: &str) -> Schema {
    Schema::new()
        .field(int, FieldType::Number)
        .field(string, FieldType::String)
}

// --- Given steps ---

#[given(regex = r#"^a method "([^"]+)" validated by an empty schema returning (.+)$"#)]
async fn given_plain_method(world: &mut InvocationWorld, name: String, result: String) {
    let run = world.returning(parse(&result));
    let config = world
        .declaration(&name)
        .validate(Schema::new().validator())
        .run(run);
    world.build(config);
}

#[given(regex = r#"^a method "([^"]+)" without validation returning (.+)$"#)]
async fn given_unvalidated_method(world: &mut InvocationWorld, name: String, result: String) {
    let run = world.returning(parse(&result));
    let config = world.declaration(&name).no_validation().run(run);
    world.build(config);
}

#[given(
    regex = r#"^a method "([^"]+)" that requires a number "([^"]+)" and a string "([^"]+)" through (a validator|the schema mixin)$"#
)]
async fn given_schema_method(
    world: &mut InvocationWorld,
    name: String,
    int: String,
    string: String,
    declared: String,
) {
    let run = world.returning(Value::from("result"));
    let schema = int_and_string(&int, &string);
    let config = world.declaration(&name).run(run);
    let config = if declared == "a validator" {
        config.validate(schema.validator())
    } else {
        config.mixin(schema_mixin()).schema(schema)
    };
    world.build(config);
}

#[given(regex = r#"^a method "([^"]+)" whose body fails with "([^"]+)"$"#)]
async fn given_failing_method(world: &mut InvocationWorld, name: String, message: String) {
    let run = world.failing(message);
    let config = world.declaration(&name).no_validation().run(run);
    world.build(config);
}

#[given(regex = r#"^a method "([^"]+)" that returns its own name$"#)]
async fn given_name_method(world: &mut InvocationWorld, name: String) {
    let config = world
        .declaration(&name)
        .no_validation()
        .run(|ctx, _| Ok(Value::from(ctx.name.clone())));
    world.build(config);
}

#[given(regex = r#"^a method "([^"]+)" whose validator returns true$"#)]
async fn given_returning_validator(world: &mut InvocationWorld, name: String) {
    let run = world.returning(Value::Null);
    let config = world
        .declaration(&name)
        .validate_with(|_, _| Ok(true))
        .run(run);
    world.build(config);
}

#[given(regex = r#"^a cached method "([^"]+)" with a TTL of (\d+) milliseconds$"#)]
async fn given_cached_method(world: &mut InvocationWorld, name: String, ttl_ms: u64) {
    let config = world.declaration(&name);
    let runs = world.runs.clone();
    let validations = world.validations.clone();
    let config = config
        .cache_ttl(Duration::from_millis(ttl_ms))
        .validate_with(move |_, _| {
            validations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .run(move |_, args| {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(args.clone())
        });
    world.build(config);
}

#[given(regex = r#"^a cached method "([^"]+)" whose body fails with "([^"]+)"$"#)]
async fn given_cached_failing_method(world: &mut InvocationWorld, name: String, message: String) {
    let run = world.failing(message);
    let config = world
        .declaration(&name)
        .cache_ttl(Duration::from_secs(60))
        .no_validation()
        .run(run);
    world.build(config);
}

// --- When steps ---

#[when(regex = r"^I call it with (.+)$")]
async fn when_call(world: &mut InvocationWorld, args: String) {
    world.call(parse(&args));
}

#[when("I call it without arguments")]
async fn when_call_no_args(world: &mut InvocationWorld) {
    let slot: Arc<Mutex<Option<MethodResult>>> = Arc::new(Mutex::new(None));
    let writer = slot.clone();
    world.method().call_no_args(move |result: MethodResult| {
        *writer.lock().unwrap() = Some(result);
    });
    world.outcome = slot.lock().unwrap().take();
}

#[when(regex = r"^I call it asynchronously with (.+)$")]
async fn when_call_async(world: &mut InvocationWorld, args: String) {
    let outcome = world.method().call_async(parse(&args)).await;
    world.outcome = Some(outcome);
}

#[when(regex = r#"^I call "([^"]+)" by name with (.+)$"#)]
async fn when_call_by_name(world: &mut InvocationWorld, name: String, args: String) {
    let outcome = world
        .connection
        .call_by_name(&name, vec![parse(&args)])
        .await;
    world.outcome = Some(outcome);
}

#[when("I execute it without a context")]
async fn when_execute(world: &mut InvocationWorld) {
    let outcome = world.method().execute(None, &Value::Null);
    world.outcome = Some(outcome);
}

#[when(regex = r"^I wait (\d+) milliseconds$")]
async fn when_wait(_world: &mut InvocationWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

// --- Then steps ---

#[then(regex = r"^the outcome is the value (.+)$")]
async fn then_value(world: &mut InvocationWorld, expected: String) {
    match world.outcome() {
        Ok(value) => assert_eq!(value, &parse(&expected)),
        Err(e) => panic!("expected a value, got error: {e}"),
    }
}

#[then(regex = r#"^the outcome is an error reading "([^"]+)"$"#)]
async fn then_error(world: &mut InvocationWorld, message: String) {
    match world.outcome() {
        Ok(value) => panic!("expected an error, got {value}"),
        Err(e) => assert_eq!(e.to_string(), message),
    }
}

#[then(regex = r"^the outcome is a validation error with (\d+) field errors$")]
async fn then_validation_error(world: &mut InvocationWorld, count: usize) {
    match world.outcome() {
        Err(e @ MethodError::Validation { .. }) => {
            assert_eq!(e.validation_errors().map(<[_]>::len), Some(count));
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[then("the outcome is a usage error")]
async fn then_usage_error(world: &mut InvocationWorld) {
    match world.outcome() {
        Err(e) => assert!(e.is_usage(), "expected a usage error, got {e:?}"),
        Ok(value) => panic!("expected a usage error, got {value}"),
    }
}

#[then(regex = r"^the method body ran (\d+) times$")]
async fn then_runs(world: &mut InvocationWorld, count: usize) {
    assert_eq!(world.runs.load(Ordering::SeqCst), count);
}

#[then(regex = r"^the validator ran (\d+) times$")]
async fn then_validations(world: &mut InvocationWorld, count: usize) {
    assert_eq!(world.validations.load(Ordering::SeqCst), count);
}
