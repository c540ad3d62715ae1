use super::*;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["citescope", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["citescope", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn parses_db_seed_command() {
    let cli = Cli::try_parse_from(["citescope", "db", "seed"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Seed
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["citescope"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_analyze_with_json_flag() {
    let cli = Cli::try_parse_from([
        "citescope",
        "analyze",
        "--file",
        "response.json",
        "--project",
        "soldier-data",
        "--json",
    ])
    .unwrap();

    match cli.command {
        Some(Commands::Analyze {
            file,
            project,
            json,
        }) => {
            assert_eq!(file, PathBuf::from("response.json"));
            assert_eq!(project, "soldier-data");
            assert!(json);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn analyze_requires_file() {
    let result = Cli::try_parse_from(["citescope", "analyze", "--project", "soldier-data"]);
    assert!(result.is_err());
}

#[test]
fn simulate_defaults() {
    let cli = Cli::try_parse_from(["citescope", "simulate", "--project", "soldier-data"]).unwrap();

    match cli.command {
        Some(Commands::Simulate {
            project,
            cite_probability,
            engines,
            offline,
        }) => {
            assert_eq!(project, "soldier-data");
            assert!((cite_probability - 0.5).abs() < f64::EPSILON);
            assert_eq!(engines, vec!["chatgpt", "perplexity", "gemini"]);
            assert!(!offline);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn simulate_with_engine_list_and_offline() {
    let cli = Cli::try_parse_from([
        "citescope",
        "simulate",
        "--project",
        "soldier-data",
        "--engines",
        "chatgpt,claude",
        "--cite-probability",
        "0.9",
        "--offline",
    ])
    .unwrap();

    match cli.command {
        Some(Commands::Simulate {
            cite_probability,
            engines,
            offline,
            ..
        }) => {
            assert!((cite_probability - 0.9).abs() < f64::EPSILON);
            assert_eq!(engines, vec!["chatgpt", "claude"]);
            assert!(offline);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn simulate_requires_project() {
    assert!(Cli::try_parse_from(["citescope", "simulate"]).is_err());
}

#[test]
fn parses_optimize_with_ai() {
    let cli = Cli::try_parse_from(["citescope", "optimize", "--project", "acme", "--ai"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Optimize { ref project, ai: true }) if project == "acme"
    ));
}

#[test]
fn optimize_without_ai_flag() {
    let cli = Cli::try_parse_from(["citescope", "optimize", "--project", "acme"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Optimize { ai: false, .. })
    ));
}

#[test]
fn report_limit_defaults_to_twenty() {
    let cli = Cli::try_parse_from(["citescope", "report", "--project", "acme"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Report { limit: 20, .. })
    ));
}

#[test]
fn report_limit_override() {
    let cli =
        Cli::try_parse_from(["citescope", "report", "--project", "acme", "--limit", "5"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Report { limit: 5, .. })
    ));
}

#[test]
fn report_rejects_non_numeric_limit() {
    let result = Cli::try_parse_from(["citescope", "report", "--project", "acme", "--limit", "x"]);
    assert!(result.is_err());
}
