use std::net::SocketAddr;

use actix_web::{get, http::header::ContentType, web, App, HttpResponse, HttpServer, Responder};
use serde::Serialize;
use tracing::info;

use crate::render;
use crate::state::{Analysis, AnalysisState};

fn html<T>(analysis: &Analysis<T>, title: &str, render_page: impl FnOnce(&T) -> String) -> HttpResponse {
    match analysis {
        Analysis::Ready { data, .. } => HttpResponse::Ok()
            .content_type(ContentType::html())
            .body(render_page(data)),
        Analysis::Unavailable { capture, reason } => HttpResponse::ServiceUnavailable()
            .content_type(ContentType::html())
            .body(render::unavailable_page(title, capture, reason)),
    }
}

fn json<T: Serialize>(analysis: &Analysis<T>) -> HttpResponse {
    match analysis {
        Analysis::Ready { .. } => HttpResponse::Ok().json(analysis),
        Analysis::Unavailable { .. } => HttpResponse::ServiceUnavailable().json(analysis),
    }
}

#[get("/protocols")]
async fn protocols(state: web::Data<AnalysisState>) -> impl Responder {
    html(&state.protocols, "Protocol usage", |rows| render::protocols_page(rows))
}

#[get("/manufacturers")]
async fn manufacturers(state: web::Data<AnalysisState>) -> impl Responder {
    html(&state.manufacturers, "Manufacturer Distribution", render::manufacturers_page)
}

#[get("/rip-graph")]
async fn rip_graph(state: web::Data<AnalysisState>) -> impl Responder {
    html(&state.rip_graph, "RIP Neighbor Graph", render::rip_graph_page)
}

#[get("/udp-port-stats")]
async fn udp_port_stats(state: web::Data<AnalysisState>) -> impl Responder {
    html(&state.udp_ports, "UDP Port Statistics", |rows| render::udp_ports_page(rows))
}

#[get("/api/protocols")]
async fn api_protocols(state: web::Data<AnalysisState>) -> impl Responder {
    json(&state.protocols)
}

#[get("/api/manufacturers")]
async fn api_manufacturers(state: web::Data<AnalysisState>) -> impl Responder {
    json(&state.manufacturers)
}

#[get("/api/rip-graph")]
async fn api_rip_graph(state: web::Data<AnalysisState>) -> impl Responder {
    json(&state.rip_graph)
}

#[get("/api/udp-port-stats")]
async fn api_udp_port_stats(state: web::Data<AnalysisState>) -> impl Responder {
    json(&state.udp_ports)
}

/// Registers every analysis endpoint; the state itself is attached by the caller.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(protocols)
        .service(manufacturers)
        .service(rip_graph)
        .service(udp_port_stats)
        .service(api_protocols)
        .service(api_manufacturers)
        .service(api_rip_graph)
        .service(api_udp_port_stats);
}

pub async fn run(state: AnalysisState, bind: SocketAddr) -> std::io::Result<()> {
    let state = web::Data::new(state);
    info!(%bind, "serving analyses");

    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(bind)?
        .run()
        .await
}
