//! Callbridge CLI - inspect and invoke method-backed services
//!
//! Ships a small demo catalog so the derivation and invocation rules can be
//! explored from the command line.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use callbridge::bridge::{
    Bridge, BridgeConfig, ClassCatalog, CollectionHandlers, ExecutionContext, MethodDef,
    NativeClass, NativeType, Parameter, Primitive, Service, ServiceRuntime, TypeRegistry, Value,
};
use callbridge::util::io_value::record_to_io;
use callbridge::util::json::{json_to_value, record_to_json, record_type_to_json};

#[derive(Parser)]
#[command(name = "callbridge")]
#[command(about = "Inspect and invoke method-backed structural services", long_about = None)]
struct Cli {
    /// Bridge configuration file (JSON)
    #[arg(short, long, default_value = "callbridge.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Rendering of an output record.
#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Pretty-printed JSON object
    Json,
    /// Preserves text syntax
    Preserves,
}

#[derive(Subcommand)]
enum Commands {
    /// List service identifiers in the catalog
    List,

    /// Show the derived input/output records of a service
    Describe {
        /// Service identifier (`<class>.<method>`)
        id: String,
    },

    /// Execute a service with positional JSON arguments
    Invoke {
        /// Service identifier (`<class>.<method>`)
        id: String,

        /// Arguments, one JSON document each
        args: Vec<String>,

        /// Output rendering
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
}

fn register_demo_catalog() {
    let catalog = ClassCatalog::global();

    catalog.register(
        NativeClass::class("demo.Greeter")
            .namespace("urn:demo:greeter")
            .method(
                MethodDef::new("greet")
                    .param(Parameter::named("first", NativeType::string()))
                    .param(Parameter::named("last", NativeType::string()))
                    .returns(NativeType::string())
                    .result_name("result")
                    .description("Join a first and last name")
                    .body(|_, args| {
                        let first = args[0].as_str().unwrap_or_default();
                        let last = args[1].as_str().unwrap_or_default();
                        Ok(Value::from(format!("{first} {last}")))
                    }),
            )
            .build(),
    );

    catalog.register(
        NativeClass::class("demo.Calculator")
            .method(
                MethodDef::new("add")
                    .param(Parameter::new(NativeType::Primitive(Primitive::Long)))
                    .param(Parameter::new(NativeType::Primitive(Primitive::Long)))
                    .returns(NativeType::Primitive(Primitive::Long))
                    .body(|_, args| {
                        let a = args[0].as_i64().ok_or_else(|| anyhow!("arg0 is required"))?;
                        let b = args[1].as_i64().ok_or_else(|| anyhow!("arg1 is required"))?;
                        Ok(Value::Int(a + b))
                    }),
            )
            .method(
                MethodDef::new("sum")
                    .param(Parameter::named(
                        "values",
                        NativeType::list_of(NativeType::class("long")),
                    ))
                    .returns(NativeType::Primitive(Primitive::Long))
                    .description("Add up a list of numbers")
                    .body(|_, args| {
                        let total = args[0]
                            .as_slice()
                            .unwrap_or_default()
                            .iter()
                            .filter_map(Value::as_i64)
                            .sum::<i64>();
                        Ok(Value::Int(total))
                    }),
            )
            .build(),
    );
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = BridgeConfig::load(&cli.config)?;
    let types = Arc::new(TypeRegistry::new(Arc::new(CollectionHandlers::with_builtins())));
    let bridge = Bridge::new(config, types);
    register_demo_catalog();

    match cli.command {
        Commands::List => {
            let catalog = ClassCatalog::global();
            for name in catalog.list() {
                let Some(class) = catalog.get(&name) else {
                    continue;
                };
                for method in class.methods() {
                    if !method.is_public() || method.is_static() {
                        continue;
                    }
                    match method.description() {
                        Some(text) => println!("{}.{}  {}", name, method.name(), text),
                        None => println!("{}.{}", name, method.name()),
                    }
                }
            }
        }

        Commands::Describe { id } => {
            let service = bridge
                .resolver()
                .resolve_method(&id)?
                .ok_or_else(|| anyhow!("no service found for '{id}'"))?;
            let iface = service.interface()?;
            let description = serde_json::json!({
                "id": service.service_id(),
                "description": service.description(),
                "input": record_type_to_json(iface.input()),
                "output": record_type_to_json(iface.output()),
                "parent": iface.parent().map(|parent| parent.id()),
            });
            println!("{}", serde_json::to_string_pretty(&description)?);
        }

        Commands::Invoke { id, args, format } => {
            let service = bridge
                .resolver()
                .resolve_method(&id)?
                .ok_or_else(|| anyhow!("no service found for '{id}'"))?;
            let iface = service.interface()?;

            let mut input = iface.input().new_instance();
            for (field, raw) in iface.input().fields.iter().zip(&args) {
                let json: serde_json::Value = serde_json::from_str(raw)
                    .with_context(|| format!("argument for '{}' is not JSON", field.name))?;
                input.set(&field.name, json_to_value(&json))?;
            }

            let runtime = ServiceRuntime::new(Arc::new(service), ExecutionContext::new());
            let output = runtime.run(Some(input))?;
            match (output, format) {
                (Some(record), OutputFormat::Json) => {
                    println!("{}", serde_json::to_string_pretty(&record_to_json(&record))?)
                }
                (Some(record), OutputFormat::Preserves) => println!("{:?}", record_to_io(&record)),
                (None, _) => println!("null"),
            }
        }
    }

    Ok(())
}
