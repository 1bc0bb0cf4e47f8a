//! A stateful chatbot: store each turn, recall relevant context with
//! predictions, and greet a returning user with what it remembers.
//!
//! ```text
//! cargo run -p recallbricks --example chatbot_memory
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use recallbricks::{Client, CreateMemory, PredictOptions, SearchOptions, SuggestedMemory};
use serde_json::json;

const USER_ID: &str = "user_12345";

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

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

struct Chatbot {
    rb: Client,
    session_id: String,
}

impl Chatbot {
    async fn handle_message(&self, user_message: &str, turn: u32) -> recallbricks::Result<()> {
        println!("User: \"{user_message}\"");

        let context = format!(
            "User message: \"{user_message}\"\nTurn: {turn}\nUser ID: {USER_ID}\nSession ID: {}",
            self.session_id
        );
        let prediction = self
            .rb
            .metacognition()
            .predict(context, PredictOptions::new().limit(3).min_confidence(0.7))
            .await?;

        println!("\nRelevant Context Retrieved:");
        for (index, memory) in prediction.suggested_memories.iter().enumerate() {
            println!("  {}. {}", index + 1, memory.memory.content);
        }

        let bot_response = generate_response(user_message, &prediction.suggested_memories);
        println!("\nBot: \"{bot_response}\"");

        let timestamp = chrono::Utc::now().to_rfc3339();
        self.rb
            .memories()
            .create_batch(vec![
                CreateMemory::new(
                    format!("User asked: \"{user_message}\""),
                    json!({
                        "user_id": USER_ID,
                        "session_id": self.session_id,
                        "turn": turn,
                        "type": "user_message",
                        "timestamp": timestamp
                    }),
                ),
                CreateMemory::new(
                    format!("Bot responded: \"{bot_response}\""),
                    json!({
                        "user_id": USER_ID,
                        "session_id": self.session_id,
                        "turn": turn,
                        "type": "bot_message",
                        "timestamp": timestamp
                    }),
                ),
            ])
            .await?;

        println!("\n✓ Conversation stored in memory");
        Ok(())
    }
}

/// Canned replies; a real bot would hand the recalled context to a model.
fn generate_response(message: &str, _context: &[SuggestedMemory]) -> &'static str {
    let message = message.to_lowercase();
    if message.contains("api design") {
        "Best practices for API design include: RESTful principles, versioning, clear documentation, consistent naming, and proper error handling."
    } else if message.contains("authentication") {
        "For authentication, I recommend using OAuth 2.0 or JWT tokens. Bearer tokens in the Authorization header are standard practice."
    } else if message.contains("code example") {
        "Here's a quick example: Authorization: Bearer your_token_here"
    } else {
        "I can help you with that! Let me provide some information based on your preferences for concise responses."
    }
}

async fn run() -> recallbricks::Result<()> {
    let started = unix_seconds();
    let bot = Chatbot {
        rb: Client::from_env()?,
        session_id: format!("session_{started}"),
    };

    println!("💬 RecallBricks Chatbot Memory Example\n");
    println!("User: {USER_ID}");
    println!("Session: {}\n", bot.session_id);

    println!("=== Session Start ===\n");
    bot.rb
        .memories()
        .create_batch(vec![
            CreateMemory::new(
                "User prefers concise responses",
                json!({"user_id": USER_ID, "type": "preference", "category": "communication_style"}),
            ),
            CreateMemory::new(
                "User is a senior software engineer",
                json!({"user_id": USER_ID, "type": "profile", "category": "professional_info"}),
            ),
            CreateMemory::new(
                "User timezone: PST (UTC-8)",
                json!({"user_id": USER_ID, "type": "profile", "category": "location"}),
            ),
        ])
        .await?;
    println!("✓ User preferences initialized\n");

    let turns = [
        "What are the best practices for API design?",
        "How about authentication specifically?",
        "Can you give me a code example?",
    ];
    for (turn, message) in (1..).zip(turns) {
        println!("--- Turn {turn} ---\n");
        bot.handle_message(message, turn).await?;
        println!();
    }

    println!("=== Session End ===\n");
    let conversation = bot
        .rb
        .memories()
        .search(
            "conversation",
            SearchOptions::new()
                .metadata(json!({"user_id": USER_ID, "session_id": bot.session_id}))
                .weights(0.3, 0.7)
                .limit(10),
        )
        .await?;
    println!("Conversation Summary:");
    println!("  Total turns: {}", turns.len());
    println!("  Topics discussed: API design, authentication, code examples");
    println!("  Memories stored: {}\n", conversation.len());

    println!("=== New Session (User Returns) ===\n");
    let new_session_id = format!("session_{}", started + 1000);
    println!("New Session: {new_session_id}\n");
    println!("User: \"Hey, I'm back!\"\n");

    let prediction = bot
        .rb
        .metacognition()
        .predict(
            format!(
                "Returning user greeting.\nUser ID: {USER_ID}\nPrevious session: Discussed API design and authentication\nSession start"
            ),
            PredictOptions::new(),
        )
        .await?;
    println!("AI Prediction for returning user:");
    println!("  Confidence: {:.1}%\n", prediction.confidence * 100.0);

    println!("Suggested Context:");
    for (index, memory) in prediction
        .suggested_memories
        .iter()
        .filter(|m| m.confidence > 0.8)
        .take(3)
        .enumerate()
    {
        println!("  {}. {}", index + 1, memory.memory.content);
        println!("     Confidence: {:.1}%", memory.confidence * 100.0);
    }

    println!("\nBot Response:");
    println!("  \"Welcome back! Last time we discussed API design and authentication.");
    println!("   Would you like to continue with code examples?\"");
    println!();

    println!("✅ Chatbot Memory Example Completed!\n");
    println!("Key features demonstrated:");
    println!("  • Store conversation history automatically");
    println!("  • Retrieve relevant context using semantic search");
    println!("  • Use predictive recall for smart suggestions");
    println!("  • Maintain user preferences across sessions");
    println!("  • Track conversation flow with metadata");
    println!("  • Welcome returning users with context awareness");

    Ok(())
}
