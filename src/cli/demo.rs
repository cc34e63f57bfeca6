use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use std::collections::HashMap;

use super::DemoKind;
use crate::config::Config;
use crate::document::Document;
use crate::info_print;
use crate::merge::ListMerger;
use crate::sample;
use crate::search::FusionPipeline;

const DEMO_QUERY: &str = "mocked local query";

pub async fn run(config: &Config, kind: DemoKind, json: bool) -> Result<()> {
    let results = match kind {
        DemoKind::Fuse => {
            let inputs: HashMap<String, Vec<Document>> = config
                .fusion
                .embedding_models
                .iter()
                .map(|model| (model.clone(), sample::retrieval_results(sample_prefix(model), 24)))
                .collect();
            if !json {
                info_print!("{}", "Running fusion on sample data...".yellow());
            }
            FusionPipeline::with_mock_transport(config)?
                .fuse(DEMO_QUERY, &inputs)
                .await?
        }
        DemoKind::Merge => {
            let first = sample::ranked_list("A", 7, 0.95);
            let mut second = sample::ranked_list("A", 3, 0.92);
            second.extend(sample::ranked_list("B", 5, 0.89));
            if !json {
                info_print!("{}", "Running merge on sample data...".yellow());
            }
            ListMerger::from_config(&config.merge).merge(&first, &second)
        }
    };

    print_summary(&results, json)
}

/// Title prefix of a model's sample documents
fn sample_prefix(model: &str) -> &str {
    match model {
        "snowflake" => "sf",
        other => other,
    }
}

fn print_summary(results: &[Document], json: bool) -> Result<()> {
    let top_score = results.first().map(Document::score);
    let top_ids: Vec<String> = results.iter().map(Document::segment_id).collect();

    if json {
        let summary = json!({
            "result_count": results.len(),
            "top_score": top_score,
            "top_ids": top_ids,
        });
        println!("{}", serde_json::to_string(&summary)?);
        return Ok(());
    }

    println!("result_count={}", results.len());
    match top_score {
        Some(score) => println!("top_score={score}"),
        None => println!("top_score=none"),
    }
    println!("top_ids={}", top_ids.join(","));
    Ok(())
}
