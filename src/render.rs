//! Chart pages for the aggregates. Pure string building, no I/O.

use std::fmt::Write;
use std::path::Path;

use serde::Serialize;

use crate::models::dto::{PortRow, ProtocolRow};
use crate::stats::{NeighborGraph, VendorReport};

const CHART_JS: &str = "https://cdn.jsdelivr.net/npm/chart.js";
const VIS_NETWORK_JS: &str = "https://unpkg.com/vis-network/standalone/umd/vis-network.min.js";

const PROTOCOL_COLORS: [&str; 3] = [
    "rgba(255, 99, 132, 0.2)",
    "rgba(54, 162, 235, 0.2)",
    "rgba(255, 206, 86, 0.2)",
];

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// JSON safe to drop inside a `<script>` element.
fn script_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace('<', "\\u003c")
}

fn document(title: &str, head: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    {head}
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape_html(title),
        head = head,
        body = body
    )
}

fn chart_script() -> String {
    format!(r#"<script src="{}"></script>"#, CHART_JS)
}

pub fn vendor_color(index: usize) -> String {
    format!(
        "rgba({}, {}, {}, 0.6)",
        index % 255,
        (index + 100) % 255,
        (index * 30 + 150) % 255
    )
}

pub fn protocols_page(rows: &[ProtocolRow]) -> String {
    let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
    let counts: Vec<u64> = rows.iter().map(|r| r.count).collect();
    let colors: Vec<&str> = (0..rows.len())
        .map(|i| PROTOCOL_COLORS[i % PROTOCOL_COLORS.len()])
        .collect();

    let body = format!(
        r#"<div style="width:1920px;height:1080px;">
    <canvas id="myChart"></canvas>
</div>
<script>
var ctx = document.getElementById('myChart').getContext('2d');
var myChart = new Chart(ctx, {{
    type: 'bar',
    data: {{
        labels: {labels},
        datasets: [{{
            label: 'Protocol usage',
            data: {counts},
            backgroundColor: {colors},
            borderColor: 'rgba(0, 0, 0, 1)',
            borderWidth: 1
        }}]
    }},
    options: {{ scales: {{ y: {{ beginAtZero: true }} }} }}
}});
</script>"#,
        labels = script_json(&labels),
        counts = script_json(&counts),
        colors = script_json(&colors),
    );
    document("Protocol usage", &chart_script(), &body)
}

pub fn manufacturers_page(report: &VendorReport) -> String {
    let rows = report.vendor_rows();
    let labels: Vec<&str> = rows.iter().map(|r| r.vendor.as_str()).collect();
    let counts: Vec<u64> = rows.iter().map(|r| r.count).collect();
    let colors: Vec<String> = (0..rows.len()).map(vendor_color).collect();

    let mut summary = String::new();
    for row in &rows {
        writeln!(
            summary,
            "    <tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&row.vendor),
            row.devices,
            row.count
        )
        .ok();
    }

    let mut details = String::new();
    for detail in report.details() {
        write!(
            details,
            r#"<div>
    <h3>{vendor} ({country})</h3>
    <p>{mac}, {packets} ARP packets</p>
    <img src="{flag}" alt="Country Flag" style="height: 50px;">
</div>
"#,
            vendor = escape_html(&detail.vendor),
            country = escape_html(&detail.country),
            mac = detail.mac,
            packets = detail.packets,
            flag = escape_html(&detail.flag_url),
        )
        .ok();
    }

    let body = format!(
        r#"<h1>Manufacturer Distribution</h1>
<div style="width:600px;">
    <canvas id="manufacturerChart"></canvas>
</div>
<script>
var ctx = document.getElementById('manufacturerChart').getContext('2d');
var manufacturerChart = new Chart(ctx, {{
    type: 'pie',
    data: {{
        labels: {labels},
        datasets: [{{
            label: 'ARP packets',
            data: {counts},
            backgroundColor: {colors},
            borderColor: 'rgba(255, 255, 255, 1)',
            borderWidth: 2
        }}]
    }}
}});
</script>
<h2>Number of Devices</h2>
<table>
    <tr><th>Vendor</th><th>Devices</th><th>ARP packets</th></tr>
{summary}</table>
<h2>Manufacturer Details</h2>
{details}"#,
        labels = script_json(&labels),
        counts = script_json(&counts),
        colors = script_json(&colors),
        summary = summary,
        details = details,
    );
    document("Manufacturer Distribution", &chart_script(), &body)
}

#[derive(Serialize)]
struct VisNode {
    id: String,
    label: String,
}

#[derive(Serialize)]
struct VisEdge {
    from: String,
    to: String,
    arrows: &'static str,
}

pub fn rip_graph_page(graph: &NeighborGraph) -> String {
    let nodes: Vec<VisNode> = graph
        .nodes()
        .iter()
        .map(|ip| VisNode {
            id: ip.to_string(),
            label: ip.to_string(),
        })
        .collect();
    let edges: Vec<VisEdge> = graph
        .edges()
        .iter()
        .map(|(src, dst)| VisEdge {
            from: src.to_string(),
            to: dst.to_string(),
            arrows: "to",
        })
        .collect();

    let head = format!(
        r#"<script type="text/javascript" src="{}"></script>
    <style>
        #network {{ width: 100%; height: 100vh; border: 1px solid lightgray; }}
    </style>"#,
        VIS_NETWORK_JS
    );
    let body = format!(
        r#"<div id="network"></div>
<script type="text/javascript">
var nodes = new vis.DataSet({nodes});
var edges = new vis.DataSet({edges});
var container = document.getElementById('network');
var options = {{
    physics: {{ stabilization: false, barnesHut: {{ springLength: 200 }} }},
    layout: {{ hierarchical: {{ direction: 'UD', sortMethod: 'directed' }} }}
}};
var network = new vis.Network(container, {{ nodes: nodes, edges: edges }}, options);
</script>"#,
        nodes = script_json(&nodes),
        edges = script_json(&edges),
    );
    document("RIP Neighbor Graph", &head, &body)
}

pub fn udp_ports_page(rows: &[PortRow]) -> String {
    let ports: Vec<u16> = rows.iter().map(|r| r.port).collect();
    let counts: Vec<u64> = rows.iter().map(|r| r.count).collect();

    let mut table = String::new();
    for row in rows {
        writeln!(table, "    <tr><td>{}</td><td>{}</td></tr>", row.port, row.count).ok();
    }

    let head = format!(
        r#"{}
    <style>
        table, th, td {{ border: 1px solid black; border-collapse: collapse; }}
        th, td {{ padding: 10px; }}
        th {{ text-align: left; }}
        #bar-chart {{ width: 80%; height: 65%; }}
    </style>"#,
        chart_script()
    );
    let body = format!(
        r#"<h1>UDP Port Usage Statistics</h1>
<div>
    <canvas id="bar-chart"></canvas>
</div>
<table>
    <tr><th>Port</th><th>Count</th></tr>
{table}</table>
<script>
var ctx = document.getElementById('bar-chart').getContext('2d');
var chart = new Chart(ctx, {{
    type: 'bar',
    data: {{
        labels: {ports},
        datasets: [{{
            label: 'Packet Count',
            backgroundColor: 'rgba(0, 123, 255, 0.5)',
            borderColor: 'rgba(0, 123, 255, 1)',
            data: {counts}
        }}]
    }},
    options: {{
        responsive: true,
        scales: {{ y: {{ beginAtZero: true }} }},
        plugins: {{
            legend: {{ display: false }},
            title: {{ display: true, text: 'UDP Port Usage' }}
        }}
    }}
}});
</script>"#,
        table = table,
        ports = script_json(&ports),
        counts = script_json(&counts),
    );
    document("UDP Port Statistics", &head, &body)
}

/// Shown instead of a chart when the analysis capture could not be read.
pub fn unavailable_page(title: &str, capture: &Path, reason: &str) -> String {
    let body = format!(
        r#"<h1>{title}</h1>
<p><strong>Analysis unavailable.</strong> The capture <code>{capture}</code> could not be read:</p>
<pre>{reason}</pre>"#,
        title = escape_html(title),
        capture = escape_html(&capture.display().to_string()),
        reason = escape_html(reason),
    );
    document(title, "", &body)
}
