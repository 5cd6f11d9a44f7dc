// src/api/handlers/ws.rs
use actix::{Actor, StreamHandler, Handler, Message, Addr, AsyncContext};
use actix_web::{web, HttpRequest, HttpResponse, Error};
use actix_web_actors::ws;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::grader::ParsedReport;
use crate::runner::ReportSink;

/// Progress of one exercise run. `status` is `running` while the worker is
/// busy and `pass`/`fail` once the report is ready.
#[derive(Message, Clone, Serialize, Debug, PartialEq, Eq)]
#[rtype(result = "()")]
pub struct RunUpdate {
    pub id: String,
    pub exercise: String,
    pub status: String,
    pub header: String,
}

#[derive(Clone, Default)]
pub struct WsBroker {
    clients: Arc<RwLock<Vec<Addr<WsConnection>>>>,
}

impl WsBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, addr: Addr<WsConnection>) {
        let mut clients = self.clients.write().await;
        clients.push(addr);
    }

    pub async fn unregister(&self, addr: &Addr<WsConnection>) {
        let mut clients = self.clients.write().await;
        clients.retain(|c| c != addr);
    }

    pub async fn broadcast(&self, msg: RunUpdate) {
        let clients = self.clients.read().await;
        for client in clients.iter() {
            client.do_send(msg.clone());
        }
    }
}

/// Publishes one run's progress to every connected client.
pub struct WsSink {
    broker: WsBroker,
    id: String,
    exercise: String,
}

impl WsSink {
    pub fn new(broker: WsBroker, id: String, exercise: String) -> Self {
        Self { broker, id, exercise }
    }
}

#[async_trait]
impl ReportSink for WsSink {
    async fn running(&self, status: &str) {
        self.broker
            .broadcast(RunUpdate {
                id: self.id.clone(),
                exercise: self.exercise.clone(),
                status: "running".to_string(),
                header: status.to_string(),
            })
            .await;
    }

    async fn publish(&self, report: &ParsedReport) {
        self.broker
            .broadcast(RunUpdate {
                id: self.id.clone(),
                exercise: self.exercise.clone(),
                status: report.status.to_string(),
                header: report.header.clone(),
            })
            .await;
    }
}

pub struct WsConnection {
    broker: WsBroker,
}

impl WsConnection {
    pub fn new(broker: WsBroker) -> Self {
        Self { broker }
    }
}

impl Actor for WsConnection {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let addr = ctx.address();
        let broker = self.broker.clone();
        actix::spawn(async move {
            broker.register(addr).await;
        });
    }

    fn stopped(&mut self, ctx: &mut Self::Context) {
        let addr = ctx.address();
        let broker = self.broker.clone();
        actix::spawn(async move {
            broker.unregister(&addr).await;
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsConnection {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Close(reason)) => ctx.close(reason),
            _ => (),
        }
    }
}

impl Handler<RunUpdate> for WsConnection {
    type Result = ();

    fn handle(&mut self, msg: RunUpdate, ctx: &mut Self::Context) {
        if let Ok(json) = serde_json::to_string(&msg) {
            ctx.text(json);
        }
    }
}

pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    broker: web::Data<WsBroker>,
) -> Result<HttpResponse, Error> {
    let conn = WsConnection::new(broker.get_ref().clone());
    ws::start(conn, &req, stream)
}
