//! Interactive chat loop.
//!
//! Each stdin line is one processed turn. Lines that classify to an
//! action intent drive the dialogue machine (mock executors); everything
//! else takes the retrieval + generation path when both providers are
//! configured, and the machine's fixed fallback otherwise. Both paths
//! append to the same conversation history.

use std::io::{BufRead, Write};

use anyhow::Result;

use crate::actions::ActionSet;
use crate::agent::{self, DialogueMachine};
use crate::config::Config;
use crate::db::SqliteIndex;
use crate::embedding;
use crate::generation;
use crate::models::{DialogueState, Intent, Message};
use crate::retrieve::{self, Retriever};

/// CLI runner for `opsmate chat`.
pub async fn run_chat(config: &Config) -> Result<()> {
    let machine = DialogueMachine::new(ActionSet::mock(), config.agent.clone());
    let mut state = DialogueState::new();

    let rag_enabled = config.embedding.is_enabled() && config.generation.is_enabled();
    let (index, embedder, generator) = if rag_enabled {
        let embedder = embedding::create_embedder(&config.embedding)?;
        let generator = generation::create_generator(&config.generation)?;
        let index = SqliteIndex::open(config).await?;
        (Some(index), Some(embedder), Some(generator))
    } else {
        (None, None, None)
    };

    println!("opsmate chat — conversation {}", state.id);
    println!(
        "Ask about your runbooks, or request an action \
         (restart / status / logs / send email). 'exit' or Ctrl-D to quit."
    );

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        let intent = agent::classify_intent(input);
        if intent != Intent::RespondPlain {
            machine.process_turn(&mut state, input);
            print_last_reply(&state);
            continue;
        }

        match (&index, &embedder, &generator) {
            (Some(index), Some(embedder), Some(generator)) => {
                state.history.push(Message::user(input));
                let retriever =
                    Retriever::new(index, embedder.as_ref(), config.retrieval.top_k);
                match retrieve::answer(
                    &retriever,
                    generator.as_ref(),
                    &config.generation.system_instruction,
                    input,
                )
                .await
                {
                    Ok(reply) => {
                        println!("opsmate> {}", reply);
                        state.history.push(Message::assistant(reply));
                    }
                    Err(e) => {
                        // The turn failed; keep the conversation going.
                        eprintln!("error: {:#}", e);
                    }
                }
            }
            _ => {
                machine.process_turn(&mut state, input);
                print_last_reply(&state);
            }
        }
    }

    if let Some(index) = index {
        index.close().await;
    }
    println!("bye");
    Ok(())
}

fn print_last_reply(state: &DialogueState) {
    if let Some(reply) = state.history.last() {
        println!("opsmate> {}", reply.text);
    }
}
