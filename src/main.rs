use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use uuid::Uuid;

use stage_diagnostic::config::Settings;
use stage_diagnostic::error::{EngineError, Error};
use stage_diagnostic::reference::ReferenceData;
use stage_diagnostic::session::{DiagnosticEngine, Phase, SessionView};
use stage_diagnostic::store::{LibSqlStore, SessionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let settings = Settings::from_env();

    // Reference data is fatal at startup — no session is served on a
    // partial or invalid dataset.
    let reference = Arc::new(match &settings.reference_path {
        Some(path) => ReferenceData::load(path)?,
        None => ReferenceData::builtin()?,
    });

    let store: Arc<dyn SessionStore> = Arc::new(LibSqlStore::new_local(&settings.db_path).await?);
    let engine = DiagnosticEngine::new(Arc::clone(&reference), store);

    // Resume an existing session via STAGE_SESSION_ID, otherwise start fresh.
    let session_id = match std::env::var("STAGE_SESSION_ID") {
        Ok(raw) => raw.parse::<Uuid>()?,
        Err(_) => Uuid::new_v4(),
    };

    eprintln!("🧭 Stage Diagnostic v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {}", settings.db_path.display());
    eprintln!("   Session:  {session_id}");
    eprintln!();

    let mut view = engine.start_session(session_id).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // ── Questionnaire ────────────────────────────────────────────────
    while let Some(question_id) = view.next_question_id {
        let question = reference
            .question(question_id)
            .ok_or_else(|| anyhow::anyhow!("reference data has no question {question_id}"))?;
        println!(
            "Question {}/{} — {}",
            view.answered + 1,
            view.total_questions,
            question.prompt
        );
        println!(
            "  Answer {} (disagree) .. {} (agree):",
            question.scale.min, question.scale.max
        );

        let Some(line) = prompt(&mut lines).await? else {
            eprintln!("Input closed, session saved. Resume with STAGE_SESSION_ID={session_id}");
            return Ok(());
        };
        let value: i64 = match line.parse() {
            Ok(v) => v,
            Err(_) => {
                println!("  Please enter a number.\n");
                continue;
            }
        };

        view = match engine.record_answer(session_id, question_id, value).await {
            Ok(view) => view,
            Err(Error::Engine(EngineError::InvalidAnswerValue { min, max, .. })) => {
                println!("  Value must be between {min} and {max}.\n");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        println!();
    }

    // ── Contact collection ───────────────────────────────────────────
    if view.phase == Phase::ContactCollection {
        view = collect_contacts(&engine, session_id, view, &mut lines).await?;
    }

    // ── Report ───────────────────────────────────────────────────────
    if view.phase == Phase::Completed {
        let result = engine.get_result(session_id).await?;
        let stage = reference
            .stage(&result.stage_id)
            .ok_or_else(|| anyhow::anyhow!("result references unknown stage {}", result.stage_id))?;

        println!("\n🏁 Your stage: {}\n", stage.name);
        println!("🧭 {}\n", stage.description);
        print_list("⚠️  Key risks", &stage.risks);
        print_list("✅ What to do", &stage.recommended);
        print_list("⛔ What to avoid", &stage.avoid);
        println!("📈 Indices (0-100)");
        for (index, value) in reference.indices().iter().zip(result.indices) {
            println!("  - {}: {:.0}", index.name, value);
        }
    }

    Ok(())
}

async fn collect_contacts(
    engine: &DiagnosticEngine,
    session_id: Uuid,
    mut view: SessionView,
    lines: &mut Lines<BufReader<Stdin>>,
) -> anyhow::Result<SessionView> {
    println!("\nAlmost done — a couple of details for the report.\n");

    for (field, label) in [
        ("name", "👤 Your name:"),
        ("revenue_range", "💰 Monthly revenue range:"),
    ] {
        // Already collected in an earlier run of this session.
        if view
            .contacts
            .keys()
            .any(|collected| collected.as_str() == field)
        {
            continue;
        }
        loop {
            println!("{label}");
            let Some(value) = prompt(lines).await? else {
                eprintln!("Input closed, session saved. Resume with STAGE_SESSION_ID={session_id}");
                return Ok(view);
            };
            if value.is_empty() {
                continue;
            }
            view = engine.record_contact(session_id, field, &value).await?;
            break;
        }
    }
    Ok(view)
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>) -> anyhow::Result<Option<String>> {
    eprint!("> ");
    Ok(lines.next_line().await?.map(|line| line.trim().to_string()))
}

fn print_list(title: &str, items: &[String]) {
    println!("{title}");
    for item in items {
        println!("  - {item}");
    }
    println!();
}
