//! Predictive recall: ask which memories a context will need, filter by
//! confidence, apply the suggested strategy and feed usage back.
//!
//! ```text
//! cargo run -p recallbricks --example predictive_recall
//! ```

use recallbricks::{Client, CreateMemory, PredictOptions, SearchOptions};
use serde_json::json;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    if let Err(error) = run().await {
        println!("❌ Error: {error}");
        if let Some(code) = error.code() {
            println!("   Code: {code}");
        }
        std::process::exit(1);
    }
}

fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

async fn run() -> recallbricks::Result<()> {
    let rb = Client::from_env()?;
    let meta = rb.metacognition();

    println!("🧠 RecallBricks Predictive Recall Example\n");

    println!("Setting up sample memories...\n");
    rb.memories()
        .create_batch(vec![
            CreateMemory::new(
                "User prefers concise documentation with code examples",
                json!({"category": "preferences", "type": "documentation"}),
            ),
            CreateMemory::new(
                "User dislikes verbose explanations",
                json!({"category": "preferences", "type": "communication"}),
            ),
            CreateMemory::new(
                "API authentication uses Bearer tokens",
                json!({"category": "api_docs", "type": "authentication"}),
            ),
            CreateMemory::new(
                "Rate limits: Tier 1 = 10 req/sec, Tier 2 = 50 req/sec",
                json!({"category": "api_docs", "type": "limits"}),
            ),
            CreateMemory::new(
                "User last asked about Python SDK installation",
                json!({"category": "activity", "type": "recent_query"}),
            ),
        ])
        .await?;

    println!("1. Basic Prediction\n");
    let prediction1 = meta
        .predict(
            "User asking about API documentation style preferences",
            PredictOptions::new(),
        )
        .await?;
    println!("Prediction:");
    println!("  Overall Confidence: {}", percent(prediction1.confidence));
    println!("  Reasoning: {}\n", prediction1.reasoning);
    println!("Suggested Memories:");
    for (index, memory) in prediction1.suggested_memories.iter().enumerate() {
        println!("  {}. \"{}\"", index + 1, memory.memory.content);
        println!("     Confidence: {}", percent(memory.confidence));
        println!("     Reasoning: {}\n", memory.reasoning);
    }

    println!("2. High-Confidence Predictions Only\n");
    let prediction2 = meta
        .predict(
            "User needs information about API authentication",
            PredictOptions::new().min_confidence(0.85).limit(3),
        )
        .await?;
    println!(
        "Found {} high-confidence suggestions:",
        prediction2.suggested_memories.len()
    );
    for (index, memory) in prediction2.suggested_memories.iter().enumerate() {
        println!("  {}. \"{}\"", index + 1, memory.memory.content);
        println!("     Confidence: {}\n", percent(memory.confidence));
    }

    println!("3. Rich Context Prediction\n");
    let rich_context = r#"
        User: "How do I get started with the Python SDK?"
        Session: New (first interaction)
        User Tier: Premium
        Previous Activity: Asked about installation 5 minutes ago
    "#;
    let prediction3 = meta
        .predict(rich_context, PredictOptions::new().include_strategy(true))
        .await?;
    if let Some(strategy) = &prediction3.suggested_strategy {
        println!("AI-Suggested Search Strategy:");
        println!("  Semantic Weight: {}", strategy.weights.semantic);
        println!("  Recency Weight: {}", strategy.weights.recency);
        println!("  Suggested Limit: {}", strategy.limit);
        if let Some(filters) = &strategy.filters {
            println!("  Filters: {filters}");
        }
    }
    println!();

    println!("4. Applying Predicted Strategy\n");
    let prediction = meta
        .predict("User wants Python SDK documentation", PredictOptions::new())
        .await?;
    let options = match &prediction.suggested_strategy {
        Some(strategy) => SearchOptions::new()
            .weights(strategy.weights.semantic, strategy.weights.recency)
            .limit(strategy.limit),
        None => SearchOptions::new(),
    };
    let results = rb.memories().search("Python SDK", options).await?;
    println!("Search Results (using AI-suggested strategy):");
    for (index, result) in results.iter().enumerate() {
        println!("  {}. \"{}\"", index + 1, result.memory.content);
        println!("     Score: {:.3}\n", result.score);
    }

    println!("5. Hybrid: Predictions + Traditional Search\n");
    let hybrid = meta
        .predict("User asking about rate limits", PredictOptions::new())
        .await?;
    let high_confidence: Vec<_> = hybrid
        .suggested_memories
        .iter()
        .filter(|m| m.confidence > 0.9)
        .collect();
    println!("High-confidence predictions (>90%): {}", high_confidence.len());
    if high_confidence.is_empty() {
        println!("No high-confidence predictions, falling back to search...");
        let fallback = rb
            .memories()
            .search("rate limits", SearchOptions::new().limit(3))
            .await?;
        println!("Found {} results via search.", fallback.len());
    } else {
        println!("Using predicted memories directly:");
        for (index, memory) in high_confidence.iter().enumerate() {
            println!("  {}. {}", index + 1, memory.memory.content);
        }
    }
    println!();

    println!("6. Learning Patterns\n");
    let patterns = meta.get_patterns().await?;
    let query = &patterns.query_patterns;
    println!("System Learning:");
    println!("  Most Queried Topics: {}", query.most_queried.join(", "));
    println!(
        "  Optimal Weights: semantic={}, recency={}",
        query.optimal_weights.semantic, query.optimal_weights.recency
    );
    println!("  Avg Retrieval Time: {}ms", query.avg_retrieval_time);
    println!(
        "  Cache Hit Rate: {}\n",
        percent(patterns.performance_metrics.cache_hit_rate)
    );

    println!("7. Providing Feedback\n");
    let used = prediction1
        .suggested_memories
        .first()
        .map(|m| vec![m.memory.id.clone()])
        .unwrap_or_default();
    meta.feedback(&prediction1.id, true, used).await?;
    println!("✓ Feedback submitted");
    println!("  This helps RecallBricks improve future predictions!\n");

    println!("8. Metacognitive Metrics\n");
    let metrics = meta.get_metrics().await?;
    println!("Learning Progress:");
    println!(
        "  Total Observations: {}",
        metrics.learning_progress.total_observations
    );
    println!(
        "  Patterns Detected: {}",
        metrics.learning_progress.patterns_detected
    );
    println!(
        "  Confidence Level: {}",
        percent(metrics.learning_progress.confidence_level)
    );
    println!();
    println!("Optimization Gains:");
    println!("  Speed: {}", metrics.optimization_gains.speed_improvement);
    println!("  Accuracy: {}", metrics.optimization_gains.accuracy_improvement);
    println!(
        "  Cache Efficiency: {}\n",
        metrics.optimization_gains.cache_efficiency
    );

    println!("✅ Predictive Recall Example Completed!\n");
    println!("Key takeaways:");
    println!("  • Predictions save you from manually crafting queries");
    println!("  • Confidence scores let you decide when to trust predictions");
    println!("  • Rich context = better predictions");
    println!("  • Suggested strategies optimize your searches automatically");
    println!("  • Feedback makes the system smarter over time");
    println!("  • The system learns and improves continuously");

    Ok(())
}
