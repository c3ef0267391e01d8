//! Invocation engine tests
//!
//! Executes method-backed services from structural records and checks
//! argument conversion, injection, output wrapping and error classification.

use anyhow::anyhow;
use callbridge::bridge::{
    BeanDef, Bridge, BridgeConfig, BridgeError, CollectionHandlers, ExecutionContext, MethodDef,
    MethodService, NativeClass, NativeType, Parameter, Primitive, Record, Service,
    ServiceError, ServiceRuntime, SharedMap, TypeRegistry, TypeSystem, Value,
};
use callbridge::bridge::context::{EXECUTION_CONTEXT_TYPE, SERVICE_RUNTIME_TYPE};
use std::error::Error as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn bridge() -> (Bridge, Arc<TypeRegistry>) {
    let types = Arc::new(TypeRegistry::new(Arc::new(CollectionHandlers::with_builtins())));
    (Bridge::new(BridgeConfig::default(), types.clone()), types)
}

fn execute(service: &MethodService, input: Option<Record>) -> Result<Record, BridgeError> {
    let output = service
        .new_instance()
        .execute(&ExecutionContext::new(), input)?;
    Ok(output.expect("method services always produce an output record"))
}

fn concat_class() -> Arc<NativeClass> {
    NativeClass::class("demo.TestPojo")
        .method(
            MethodDef::new("concat")
                .param(Parameter::named("a", NativeType::string()))
                .param(Parameter::named("b", NativeType::string()))
                .returns(NativeType::string())
                .result_name("result")
                .body(|_, args| {
                    let a = args[0].as_str().unwrap_or_default();
                    let b = args[1].as_str().unwrap_or_default();
                    Ok(Value::from(format!("{a} {b}")))
                }),
        )
        .build()
}

#[test]
fn positional_round_trip() {
    let (bridge, _) = bridge();
    let service = bridge.service(&concat_class(), "concat").unwrap();
    let iface = service.interface().unwrap();

    let input = iface
        .input()
        .new_instance()
        .with("a", "testing")
        .unwrap()
        .with("b", "this")
        .unwrap();
    let output = execute(&service, Some(input)).unwrap();

    assert_eq!(output.record_type().name, "concatResponse");
    assert_eq!(output.value("result"), &Value::from("testing this"));
    assert_eq!(output.get_at(0), &Value::from("testing this"));
}

#[test]
fn null_fields_become_null_arguments() {
    let (bridge, _) = bridge();
    let class = NativeClass::class("demo.Nulls")
        .method(
            MethodDef::new("kinds")
                .param(Parameter::named("text", NativeType::string()))
                .param(Parameter::named("anything", NativeType::Any))
                .returns(NativeType::string())
                .body(|_, args| {
                    let kinds: Vec<&str> = args.iter().map(Value::kind).collect();
                    Ok(Value::from(kinds.join(",")))
                }),
        )
        .build();
    let service = bridge.service(&class, "kinds").unwrap();
    let iface = service.interface().unwrap();

    let output = execute(&service, Some(iface.input().new_instance())).unwrap();
    assert_eq!(output.get_at(0), &Value::from("null,null"));

    let output = execute(&service, None).unwrap();
    assert_eq!(output.get_at(0), &Value::from("null,null"));
}

#[test]
fn absent_input_preserves_arity() {
    let (bridge, _) = bridge();
    let class = NativeClass::class("demo.Arity")
        .method(
            MethodDef::new("count")
                .param(Parameter::new(NativeType::string()))
                .param(Parameter::new(NativeType::string()))
                .param(Parameter::new(NativeType::list_of(NativeType::string())))
                .returns(NativeType::Primitive(Primitive::Int))
                .body(|_, args| Ok(Value::Int(args.len() as i64))),
        )
        .build();
    let service = bridge.service(&class, "count").unwrap();
    assert_eq!(execute(&service, None).unwrap().get_at(0), &Value::Int(3));
}

#[test]
fn nested_record_collections_convert_in_order() {
    let (bridge, types) = bridge();
    types.register_bean(
        BeanDef::new("demo.Item")
            .property("sku", NativeType::string())
            .property("qty", NativeType::Primitive(Primitive::Int)),
    );
    let class = NativeClass::class("demo.Warehouse")
        .method(
            MethodDef::new("skus")
                .param(Parameter::named("items", NativeType::array_of(NativeType::class("demo.Item"))))
                .returns(NativeType::string())
                .body(|_, args| {
                    let Value::Array(items) = &args[0] else {
                        return Err(anyhow!("expected an array, got {}", args[0].kind()));
                    };
                    let skus: Vec<String> = items
                        .iter()
                        .map(|item| {
                            let bean = item.as_object().expect("converted to bean");
                            assert_eq!(bean.class, "demo.Item");
                            bean.get("sku").as_str().unwrap_or_default().to_string()
                        })
                        .collect();
                    Ok(Value::from(skus.join(",")))
                }),
        )
        .build();
    let service = bridge.service(&class, "skus").unwrap();
    let iface = service.interface().unwrap();

    let item_type = types
        .resolve_record(&NativeType::class("demo.Item"))
        .unwrap()
        .unwrap();
    let items: Vec<Value> = ["a", "b", "c"]
        .iter()
        .enumerate()
        .map(|(qty, sku)| {
            Value::Record(
                item_type
                    .new_instance()
                    .with("sku", *sku)
                    .unwrap()
                    .with("qty", qty as i64)
                    .unwrap(),
            )
        })
        .collect();

    let input = iface.input().new_instance().with("items", items).unwrap();
    let output = execute(&service, Some(input)).unwrap();
    assert_eq!(output.get_at(0), &Value::from("a,b,c"));
}

#[test]
fn maps_pass_through_by_reference() {
    let (bridge, _) = bridge();
    let class = NativeClass::class("demo.Settings")
        .method(
            MethodDef::new("touch")
                .param(Parameter::named("settings", NativeType::map_of(NativeType::Any)))
                .body(|_, args| {
                    let Value::Map(map) = &args[0] else {
                        return Err(anyhow!("expected a map"));
                    };
                    map.insert("touched", Value::Bool(true));
                    Ok(Value::Null)
                }),
        )
        .build();
    let service = bridge.service(&class, "touch").unwrap();
    let iface = service.interface().unwrap();

    let settings = SharedMap::new();
    let input = iface
        .input()
        .new_instance()
        .with("settings", settings.clone())
        .unwrap();
    let output = execute(&service, Some(input)).unwrap();

    assert!(output.record_type().fields.is_empty());
    assert_eq!(settings.get("touched"), Some(Value::Bool(true)));
}

#[test]
fn collections_into_scalar_parameters_fail() {
    let (bridge, _) = bridge();
    let service = bridge.service(&concat_class(), "concat").unwrap();
    let iface = service.interface().unwrap();
    let input = iface
        .input()
        .new_instance()
        .with("a", vec![Value::from("x")])
        .unwrap();

    let err = execute(&service, Some(input)).expect_err("list into string");
    assert!(err.to_string().starts_with("[POJO-1]"));
    assert!(matches!(err, BridgeError::CollectionTargetMismatch { ref field, .. } if field == "a"));
}

fn failing_class() -> Arc<NativeClass> {
    NativeClass::class("demo.Failing")
        .method(
            MethodDef::new("domain")
                .param(Parameter::named("user", NativeType::string()))
                .body(|_, _| Err(ServiceError::new("APP-9", "denied").into())),
        )
        .method(
            MethodDef::new("nested").body(|_, _| {
                Err(BridgeError::from(ServiceError::new("APP-3", "nested denial")).into())
            }),
        )
        .method(
            MethodDef::new("fault")
                .param(Parameter::named("user", NativeType::string()))
                .body(|_, _| Err(anyhow!("disk on fire"))),
        )
        .method(MethodDef::new("explode").body(|_, _| panic!("kaboom")))
        .build()
}

#[test]
fn domain_errors_pass_through_unchanged() {
    let (bridge, _) = bridge();
    let class = failing_class();

    let err = execute(&bridge.service(&class, "domain").unwrap(), None).expect_err("denied");
    match err {
        BridgeError::Service(domain) => assert_eq!(domain, ServiceError::new("APP-9", "denied")),
        other => panic!("expected domain error, got {other:?}"),
    }

    let err = execute(&bridge.service(&class, "nested").unwrap(), None).expect_err("denied");
    assert_eq!(err.to_string(), "[APP-3] nested denial");
}

#[test]
fn other_failures_are_wrapped_with_identity() {
    let (bridge, _) = bridge();
    let class = failing_class();
    let service = bridge.service(&class, "fault").unwrap();
    let iface = service.interface().unwrap();
    let input = iface.input().new_instance().with("user", "bob").unwrap();

    let err = execute(&service, Some(input)).expect_err("fault");
    assert_eq!(
        err.to_string(),
        "[JAVA-0] Method demo.Failing.fault threw exception (arguments: [String(\"bob\")])"
    );
    assert_eq!(err.source().map(|s| s.to_string()), Some("disk on fire".to_string()));
}

#[test]
fn panics_are_wrapped_as_invocation_errors() {
    let (bridge, _) = bridge();
    let err = execute(&bridge.service(&failing_class(), "explode").unwrap(), None)
        .expect_err("panic");
    match err {
        BridgeError::Invocation { service, source, .. } => {
            assert_eq!(service, "demo.Failing.explode");
            assert_eq!(source.to_string(), "kaboom");
        }
        other => panic!("expected invocation error, got {other:?}"),
    }
}

#[test]
fn injection_slots_receive_context_and_runtime() {
    let (bridge, _) = bridge();
    let class = NativeClass::class("demo.Clock")
        .field("ctx", NativeType::class(EXECUTION_CONTEXT_TYPE))
        .field("rt", NativeType::class(SERVICE_RUNTIME_TYPE))
        .method(
            MethodDef::new("whoami")
                .returns(NativeType::string())
                .body(|receiver, _| {
                    let ctx = receiver.context().ok_or_else(|| anyhow!("no context injected"))?;
                    let runtime = receiver.runtime().ok_or_else(|| anyhow!("no runtime injected"))?;
                    assert_eq!(runtime.context(), ctx);
                    Ok(Value::from(runtime.service_id().unwrap_or_default().to_string()))
                }),
        )
        .build();
    let service: Arc<dyn Service> = Arc::new(bridge.service(&class, "whoami").unwrap());

    let output = ServiceRuntime::new(service, ExecutionContext::new())
        .run(None)
        .unwrap()
        .unwrap();
    assert_eq!(output.get_at(0), &Value::from("demo.Clock.whoami"));
}

#[test]
fn owners_without_slots_get_nothing_injected() {
    let (bridge, _) = bridge();
    let class = NativeClass::class("demo.Plain")
        .method(
            MethodDef::new("check")
                .returns(NativeType::Primitive(Primitive::Bool))
                .body(|receiver, _| Ok(Value::Bool(receiver.context().is_none() && receiver.runtime().is_none()))),
        )
        .build();
    let output = execute(&bridge.service(&class, "check").unwrap(), None).unwrap();
    assert_eq!(output.get_at(0), &Value::Bool(true));
}

#[test]
fn each_execution_gets_a_fresh_owner() {
    #[derive(Default)]
    struct Counter {
        calls: i64,
    }

    let (bridge, _) = bridge();
    let class = NativeClass::class("demo.Counter")
        .constructor(Counter::default)
        .method(
            MethodDef::new("bump")
                .returns(NativeType::Primitive(Primitive::Long))
                .body(|receiver, _| {
                    let counter = receiver
                        .state_mut::<Counter>()
                        .ok_or_else(|| anyhow!("unexpected state"))?;
                    counter.calls += 1;
                    Ok(Value::Int(counter.calls))
                }),
        )
        .build();
    let service = bridge.service(&class, "bump").unwrap();

    for _ in 0..3 {
        assert_eq!(execute(&service, None).unwrap().get_at(0), &Value::Int(1));
    }
}

#[test]
fn null_returns_leave_the_output_field_unset() {
    let (bridge, _) = bridge();
    let class = NativeClass::class("demo.Maybe")
        .method(
            MethodDef::new("find")
                .returns(NativeType::string())
                .body(|_, _| Ok(Value::Null)),
        )
        .build();
    let output = execute(&bridge.service(&class, "find").unwrap(), None).unwrap();
    assert_eq!(output.record_type().fields.len(), 1);
    assert!(output.get_at(0).is_null());
}

#[test]
fn unresolvable_return_types_fail_before_the_body_runs() {
    let (bridge, _) = bridge();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let class = NativeClass::class("demo.Lookup")
        .method(
            MethodDef::new("fetch")
                .returns(NativeType::class("demo.Missing"))
                .body(move |_, _| {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::Null)
                }),
        )
        .build();
    let service = bridge.service(&class, "fetch").unwrap();

    let err = execute(&service, None).expect_err("return type is unknown");
    assert!(matches!(
        err,
        BridgeError::TypeUnresolved { ref type_name } if type_name == "demo.Missing"
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
