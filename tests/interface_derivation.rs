//! Interface derivation tests
//!
//! Covers signature-keyed caching, field naming and optionality rules, and
//! parent linking through implemented interfaces.

use callbridge::bridge::{
    BeanDef, Bridge, BridgeConfig, BridgeError, CollectionHandlers, MaxOccurs, MethodDef,
    NativeClass, NativeType, Parameter, Primitive, TypeRegistry,
};
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;

fn bridge() -> (Bridge, Arc<TypeRegistry>) {
    let types = Arc::new(TypeRegistry::new(Arc::new(CollectionHandlers::with_builtins())));
    (Bridge::new(BridgeConfig::default(), types.clone()), types)
}

fn greeter_interface() -> Arc<NativeClass> {
    NativeClass::interface("demo.Greeter")
        .method(
            MethodDef::new("greet")
                .param(Parameter::named("name", NativeType::string()))
                .returns(NativeType::string()),
        )
        .build()
}

#[test]
fn derivation_is_idempotent() {
    let (bridge, _) = bridge();
    let iface = greeter_interface();
    let method = iface.method("greet").unwrap();

    let first = bridge.interface(method).unwrap();
    let second = bridge.interface(method).unwrap();

    assert_eq!(first, second);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(bridge.interfaces().len(), 1);
}

#[test]
fn concurrent_first_use_builds_one_interface() {
    let (bridge, _) = bridge();
    let bridge = Arc::new(bridge);
    let iface = greeter_interface();
    let method = iface.method("greet").unwrap().clone();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let bridge = bridge.clone();
            let method = method.clone();
            thread::spawn(move || bridge.interface(&method).unwrap())
        })
        .collect();
    let derived: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for iface in &derived[1..] {
        assert!(Arc::ptr_eq(iface, &derived[0]));
    }
}

#[test]
fn overriding_methods_link_to_the_interface_declaration() {
    let (bridge, _) = bridge();
    let parent = greeter_interface();
    let class = NativeClass::class("demo.FriendlyGreeter")
        .implements(parent.clone())
        .method(
            MethodDef::new("greet")
                .param(Parameter::named("name", NativeType::string()))
                .returns(NativeType::string()),
        )
        .build();

    let child = bridge.interface(class.method("greet").unwrap()).unwrap();
    let declared = bridge.interface(parent.method("greet").unwrap()).unwrap();

    let linked = child.parent().expect("parent linked");
    assert!(Arc::ptr_eq(&linked, &declared));
    assert!(child.is_implementation_of(&declared));
    assert!(!declared.is_implementation_of(&child));
}

#[test]
fn differing_parameter_lists_do_not_link() {
    let (bridge, _) = bridge();
    let class = NativeClass::class("demo.LoudGreeter")
        .implements(greeter_interface())
        .method(
            MethodDef::new("greet")
                .param(Parameter::named("times", NativeType::Primitive(Primitive::Int)))
                .returns(NativeType::string()),
        )
        .build();

    let iface = bridge.interface(class.method("greet").unwrap()).unwrap();
    assert!(iface.parent().is_none());
}

#[test]
fn unresolved_types_can_be_retried_after_registration() {
    let (bridge, types) = bridge();
    let class = NativeClass::class("demo.Orders")
        .method(
            MethodDef::new("place")
                .param(Parameter::named("order", NativeType::class("demo.Order")))
                .returns(NativeType::Primitive(Primitive::Bool)),
        )
        .build();
    let method = class.method("place").unwrap();

    let err = bridge.interface(method).expect_err("order is unknown");
    assert!(matches!(err, BridgeError::TypeUnresolved { ref type_name } if type_name == "demo.Order"));

    types.register_bean(BeanDef::new("demo.Order").property("sku", NativeType::string()));
    let iface = bridge.interface(method).unwrap();
    assert_eq!(iface.input().fields[0].kind.type_name(), "Order");
}

#[test]
fn collection_parameters_are_unbounded() {
    let (bridge, types) = bridge();
    types.register_bean(BeanDef::new("demo.Item").property("sku", NativeType::string()));
    let class = NativeClass::class("demo.Cart")
        .method(
            MethodDef::new("fill")
                .param(Parameter::named("items", NativeType::list_of(NativeType::class("demo.Item"))))
                .param(Parameter::named("payload", NativeType::Bytes)),
        )
        .build();

    let iface = bridge.interface(class.method("fill").unwrap()).unwrap();
    let items = &iface.input().fields[0];
    let payload = &iface.input().fields[1];
    assert_eq!(items.max_occurs, MaxOccurs::Unbounded);
    assert_eq!(items.kind.type_name(), "Item");
    assert_eq!(payload.max_occurs, MaxOccurs::Bounded(1));
    assert_eq!(payload.kind.type_name(), "bytes");
    assert!(iface.output().fields.is_empty());
}

#[test]
fn naming_follows_the_bridge_config() {
    let types = Arc::new(TypeRegistry::new(Arc::new(CollectionHandlers::with_builtins())));
    let config = BridgeConfig {
        positional_prefix: "p".to_string(),
        response_field: "out".to_string(),
        response_suffix: "Reply".to_string(),
        ..BridgeConfig::default()
    };
    let bridge = Bridge::new(config, types);
    let class = NativeClass::class("demo.Echo")
        .method(
            MethodDef::new("echo")
                .param(Parameter::new(NativeType::string()))
                .returns(NativeType::string()),
        )
        .build();

    let iface = bridge.interface(class.method("echo").unwrap()).unwrap();
    assert_eq!(iface.input().fields[0].name, "p0");
    assert_eq!(iface.output().name, "echoReply");
    assert_eq!(iface.output_field().unwrap().name, "out");
}

fn primitive() -> impl Strategy<Value = Primitive> {
    prop::sample::select(Primitive::ALL.to_vec())
}

proptest! {
    #[test]
    fn primitive_parameters_are_required(p in primitive(), non_null in any::<bool>()) {
        let (bridge, _) = bridge();
        let class = NativeClass::class("demo.Prim")
            .method(MethodDef::new("take").param(Parameter {
                ty: NativeType::Primitive(p),
                name: None,
                non_null,
            }))
            .build();
        let iface = bridge.interface(class.method("take").unwrap()).unwrap();
        prop_assert_eq!(iface.input().fields[0].min_occurs, 1);
        prop_assert_eq!(iface.input().fields[0].kind.type_name(), p.boxed_name());
    }

    #[test]
    fn boxed_parameters_follow_the_non_null_hint(p in primitive(), non_null in any::<bool>()) {
        let (bridge, _) = bridge();
        let class = NativeClass::class("demo.Boxed")
            .method(MethodDef::new("take").param(Parameter {
                ty: NativeType::class(p.boxed_name()),
                name: None,
                non_null,
            }))
            .build();
        let iface = bridge.interface(class.method("take").unwrap()).unwrap();
        prop_assert_eq!(iface.input().fields[0].min_occurs, u32::from(non_null));
    }
}
