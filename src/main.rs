use clap::Parser;
use transparencia_etl::domain::ports::TableSink;
use transparencia_etl::utils::{logger, validation::Validate};
use transparencia_etl::{CliArgs, CsvSink, EtlEngine, HttpFetcher, SqliteSink};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting transparencia-etl");

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Failed to load configuration: {}", e);
            eprintln!("❌ {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };
    tracing::debug!("Config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    // 建立輸出端；兩者皆不可用時才視為無法啟動
    let mut sinks: Vec<Box<dyn TableSink>> = Vec::new();
    match SqliteSink::open(&config.output.database_path, config.fields.clone()) {
        Ok(sink) => sinks.push(Box::new(sink)),
        Err(e) => tracing::error!(
            "❌ Cannot open database {}: {}",
            config.output.database_path,
            e
        ),
    }
    match CsvSink::new(&config.output.output_dir) {
        Ok(sink) => {
            let sink = config.datasets.iter().fold(sink, |sink, dataset| {
                sink.with_file_name(dataset.name.clone(), dataset.csv_file_name())
            });
            sinks.push(Box::new(sink));
        }
        Err(e) => tracing::error!(
            "❌ Cannot use output directory {}: {}",
            config.output.output_dir,
            e
        ),
    }
    if sinks.is_empty() {
        eprintln!("❌ No usable output: both the database and the CSV directory failed to open");
        std::process::exit(1);
    }

    let fetcher = match HttpFetcher::new(config.pagination.timeout()) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            tracing::error!("❌ Cannot build HTTP client: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let mut engine = EtlEngine::new(config, fetcher, sinks);
    let outcome = engine.run().await;

    for dataset in &outcome.datasets {
        println!(
            "{}: {} records, {} pages ({})",
            dataset.name, dataset.records, dataset.pages_requested, dataset.stop_reason
        );
    }
    for failure in &outcome.persist.failures {
        eprintln!("❌ {}", failure);
    }

    if outcome.is_clean() {
        tracing::info!("✅ Run completed");
    } else {
        tracing::warn!("⚠️  Run completed with partial results; see errors above");
    }
}
