//! Minimal broker round-trip with the console logger attached.
//!
//! Run with: cargo run -p courier-services --example greeter -- <name>

use std::env;

use serde_json::json;

use courier_core::{Broker, Context, Message, Payload, Registrant, Response, Subscriptions, handler_fn};
use courier_services::Logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let name = env::args().nth(1).unwrap_or_else(|| "world".to_string());

    let broker = Broker::new();
    broker.register(Registrant::service(Logger::new()))?;
    broker.register(Subscriptions::new().on(
        "GREET",
        handler_fn(|payload: Payload, _context, _kind, _messenger| async move {
            let name = payload
                .get("name")
                .and_then(|value| value.as_str())
                .unwrap_or("world");
            Ok(Some(Response::from(
                Message::new("GREETING").with("text", json!(format!("hello, {name}"))),
            )))
        }),
    ))?;

    let mut payload = Payload::new();
    payload.insert("name".into(), json!(name));
    let reply = broker.ask_with("GREET", payload, Context::new()).await;

    println!("{}", reply.payload.get("text").and_then(|v| v.as_str()).unwrap_or("?"));
    Ok(())
}
