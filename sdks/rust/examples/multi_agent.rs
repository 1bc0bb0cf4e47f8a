//! Multi-agent collaboration: register agents, attribute memories to them,
//! inspect reputation, synthesize their knowledge and compare them.
//!
//! ```text
//! cargo run -p recallbricks --example multi_agent
//! ```

use recallbricks::{AgentContribution, Client, CreateMemory, Memory, RegisterAgent, UpdateAgent};
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

fn ids(memories: &[Memory]) -> Vec<String> {
    memories.iter().map(|m| m.id.clone()).collect()
}

fn finding(content: &str, agent: &str, source: &str, confidence: f64) -> CreateMemory {
    CreateMemory::new(
        content,
        json!({"agentId": agent, "source": source, "confidence": confidence}),
    )
}

async fn run() -> recallbricks::Result<()> {
    let rb = Client::from_env()?;
    let collab = rb.collaboration();

    println!("🤝 RecallBricks Multi-Agent Collaboration Example\n");

    println!("1. Registering Specialized Agents\n");
    let web_researcher = collab
        .register_agent(
            RegisterAgent::new("web-researcher", "research")
                .capabilities(["web_search", "fact_checking", "source_verification"])
                .metadata(json!({"team": "research", "specialization": "web_intelligence"})),
        )
        .await?;
    println!("✓ Registered: {}", web_researcher.agent_id);
    println!("  Role: {}", web_researcher.role);
    println!("  Initial Reputation: {}\n", web_researcher.reputation_score);

    let data_analyst = collab
        .register_agent(
            RegisterAgent::new("data-analyst", "analysis")
                .capabilities(["data_processing", "statistical_analysis", "pattern_detection"])
                .metadata(json!({"team": "analytics", "specialization": "quantitative_analysis"})),
        )
        .await?;
    println!("✓ Registered: {}", data_analyst.agent_id);
    println!("  Role: {}\n", data_analyst.role);

    let market_researcher = collab
        .register_agent(
            RegisterAgent::new("market-researcher", "market_intelligence")
                .capabilities(["market_analysis", "competitive_intelligence", "trend_forecasting"])
                .metadata(json!({"team": "research", "specialization": "market_trends"})),
        )
        .await?;
    println!("✓ Registered: {}\n", market_researcher.agent_id);

    println!("2. Agents Contributing Knowledge\n");
    let memories = rb.memories();
    let web_memories = memories
        .create_batch(vec![
            finding(
                "Study shows 73% of developers use AI coding tools in 2024",
                "web-researcher",
                "Stack Overflow Developer Survey 2024",
                0.95,
            ),
            finding(
                "GitHub Copilot reported 1M+ paying subscribers",
                "web-researcher",
                "GitHub Blog",
                0.98,
            ),
        ])
        .await?;
    println!("✓ Web Researcher: Created {} memories", web_memories.len());

    let data_memories = memories
        .create_batch(vec![
            finding(
                "Internal survey: 68% of our users adopted AI tools in Q4 2024",
                "data-analyst",
                "Internal Data",
                0.92,
            ),
            finding(
                "Average productivity increase: 35% with AI assistance",
                "data-analyst",
                "User Analytics",
                0.89,
            ),
        ])
        .await?;
    println!("✓ Data Analyst: Created {} memories", data_memories.len());

    let market_memories = memories
        .create_batch(vec![
            finding(
                "AI developer tools market size: $4.2B in 2024, growing 45% YoY",
                "market-researcher",
                "Gartner Market Research",
                0.91,
            ),
            finding(
                "Top competitors: GitHub Copilot, Cursor, Tabnine",
                "market-researcher",
                "Competitive Analysis",
                0.87,
            ),
        ])
        .await?;
    println!("✓ Market Researcher: Created {} memories\n", market_memories.len());

    println!("3. Agent Reputation Scores\n");
    let agents = ["web-researcher", "data-analyst", "market-researcher"];
    for agent_id in agents {
        let reputation = collab.get_reputation(agent_id).await?;
        println!("{agent_id}:");
        println!("  Reputation Score: {}", percent(reputation.reputation_score));
        println!("  Tier: {}", reputation.tier);
        println!("  Total Contributions: {}", reputation.total_contributions);
        println!(
            "  Average Confidence: {}\n",
            percent(reputation.average_confidence)
        );
    }

    println!("4. Collaborative Knowledge Synthesis\n");
    let synthesis = collab
        .synthesize(
            vec![
                AgentContribution::new("web-researcher", ids(&web_memories)).reputation(0.94),
                AgentContribution::new("data-analyst", ids(&data_memories)).reputation(0.91),
                AgentContribution::new("market-researcher", ids(&market_memories))
                    .reputation(0.88),
            ],
            "AI developer tools adoption and market trends",
            Some(0.85),
        )
        .await?;
    println!("Synthesized Insights:");
    for (index, insight) in synthesis.synthesized_memories.iter().enumerate() {
        println!("\n  {}. {}", index + 1, insight.content);
        println!(
            "     Contributing Agents: {}",
            insight.contributing_agents.join(", ")
        );
        println!("     Confidence: {}", percent(insight.confidence));
    }
    println!("\nTop Contributors:");
    for (index, contributor) in synthesis.top_contributors.iter().enumerate() {
        println!(
            "  {}. {} ({} contribution)",
            index + 1,
            contributor.agent_id,
            percent(contributor.contribution)
        );
    }
    println!(
        "\nAggregate Confidence: {}\n",
        percent(synthesis.aggregate_confidence)
    );

    println!("5. Filtering by Reputation\n");
    let trusted = collab.get_agent_memories(Some(0.9), Some(5)).await?;
    println!("Memories from high-reputation agents (>90%):");
    for (index, memory) in trusted.iter().enumerate() {
        println!("  {}. {}", index + 1, memory.memory.content);
        println!(
            "     Agent: {} ({})\n",
            memory.agent_id,
            percent(memory.agent_reputation)
        );
    }

    println!("6. Agent Performance Comparison\n");
    let comparison = collab
        .compare_agents(
            agents,
            &["reputation_score", "total_contributions", "average_confidence"],
        )
        .await?;
    println!("Performance Rankings:");
    for (index, agent) in comparison.agents.iter().enumerate() {
        println!("  {}. {}", index + 1, agent.agent_id);
        println!("     Reputation: {}", percent(agent.reputation_score));
        println!("     Contributions: {}", agent.total_contributions);
        println!("     Avg Confidence: {}", percent(agent.average_confidence));
        println!("     Rank: {}\n", agent.rank);
    }
    println!(
        "Top Performer: {}\n",
        comparison.top_performer.as_deref().unwrap_or("-")
    );
    if !comparison.insights.is_empty() {
        println!("Insights:");
        for insight in &comparison.insights {
            println!("  • {insight}");
        }
        println!();
    }

    println!("7. Updating Agent\n");
    collab
        .update_agent(
            "web-researcher",
            UpdateAgent {
                capabilities: Some(
                    [
                        "web_search",
                        "fact_checking",
                        "source_verification",
                        "real_time_monitoring",
                    ]
                    .map(String::from)
                    .to_vec(),
                ),
                metadata: Some(json!({
                    "team": "research",
                    "specialization": "web_intelligence",
                    "version": "2.0"
                })),
            },
        )
        .await?;
    println!("✓ Updated web-researcher with new capabilities\n");

    println!("✅ Multi-Agent Collaboration Example Completed!\n");
    println!("Key takeaways:");
    println!("  • Each agent builds reputation based on contribution quality");
    println!("  • High-reputation agents have more influence in synthesis");
    println!("  • Filter memories by reputation for quality assurance");
    println!("  • Compare agents to identify top performers");
    println!("  • Route queries to specialized, high-reputation agents");
    println!("  • Build consensus through reputation-weighted aggregation");
    println!("  • System automatically tracks and rewards quality");

    Ok(())
}
