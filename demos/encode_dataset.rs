//! Encode a small on-disk dataset and print the resulting records

use graphfeed::prelude::*;
use serde_json::json;

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    // A miniature routing dataset: two samples in one JSON array plus
    // one stand-alone sample file.
    let dir = std::env::temp_dir().join("graphfeed_demo");
    std::fs::create_dir_all(&dir)?;

    let sample = |delay: f64| {
        json!({
            "link": ["l0", "l1", "l2"],
            "router": ["r0", "r1"],
            "path": ["p0", "p1"],
            "capacity": [10.0, 10.0, 40.0],
            "link_to_path": [
                ["l0", "p0"], ["l1", "p0"], ["l2", "p1"], ["l0", "p1"]
            ],
            "router_to_path": [["r0", "p0"], ["r1", "p1"]],
            "path_order": ["link", "router", "link"],
            "delay": [delay, delay * 2.0]
        })
    };

    std::fs::write(
        dir.join("batch.json"),
        json!([sample(0.5), sample(0.7)]).to_string(),
    )?;
    std::fs::write(dir.join("single.json"), sample(0.9).to_string())?;

    let schema = GraphSchema {
        entities: vec!["link".to_string(), "router".to_string(), "path".to_string()],
        features: vec!["capacity".to_string()],
        additional_inputs: vec![],
        output: "delay".to_string(),
        adjacencies: vec![
            AdjacencySpec::new("link_to_path", "link", "path"),
            AdjacencySpec::new("router_to_path", "router", "path"),
        ],
        interleaves: vec![InterleaveSpec::new("path_order", "path")],
    };

    let stream = RecordStream::open(&dir, schema, Mode::Training, ReadOptions::default())?;

    for (i, record) in stream.enumerate() {
        println!("--- record {} ---", i);
        for (name, value) in record.fields() {
            println!("  {:<24} {:?}", name, value);
        }
        println!("  {:<24} {:?}", "output", record.output());
    }

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
