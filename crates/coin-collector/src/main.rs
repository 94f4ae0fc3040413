//! CoinGecko 시세 수집기 CLI.

use std::sync::Arc;

use clap::Parser;
use coin_data::{AssetStore, CoinGeckoClient, IconBlobStore, MemoryAssetStore, PgAssetStore};
use coin_collector::modules::{EnrichmentPolicy, ReconciliationEngine, RunMode, Scheduler};
use coin_collector::{CollectorConfig, RequestLimiter, TokioPacer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "coin-collector")]
#[command(about = "Fetches top coins from CoinGecko and updates the database", long_about = None)]
#[command(version)]
struct Cli {
    /// 60초(설정값) 간격으로 무한 반복 실행
    #[arg(long = "loop")]
    run_loop: bool,

    /// DB 대신 메모리 저장소 사용 (dry-run)
    #[arg(long)]
    memory: bool,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 로깅 초기화
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("coin_collector={0},coin_data={0}", cli.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Coin Collector 시작");

    // 설정 로드
    let config = CollectorConfig::from_env()?;
    tracing::debug!(
        base_url = %config.provider.base_url,
        per_page = config.provider.per_page,
        media_root = %config.media_root.display(),
        "설정 로드 완료"
    );

    // 저장소
    let mut pg_store = None;
    let store: Arc<dyn AssetStore> = if cli.memory {
        tracing::warn!("메모리 저장소 사용: 종료 시 데이터가 사라집니다");
        Arc::new(MemoryAssetStore::new())
    } else {
        let icons = IconBlobStore::new(&config.media_root);
        let pg = PgAssetStore::connect(&config.database()?, icons).await?;
        pg.ensure_schema().await?;
        pg_store = Some(pg.clone());
        Arc::new(pg)
    };

    // 파이프라인 구성
    let source = Arc::new(CoinGeckoClient::new(config.provider.to_options())?);
    let limiter = Arc::new(RequestLimiter::with_tokio(config.pacing.clone()));
    let policy = EnrichmentPolicy::new(source.clone(), store.clone(), limiter);
    let engine = ReconciliationEngine::new(source, store, policy);

    let mode = if cli.run_loop {
        RunMode::Loop {
            interval: config.schedule.interval(),
        }
    } else {
        RunMode::Once
    };
    let mut scheduler = Scheduler::new(engine, mode, Arc::new(TokioPacer));

    match mode {
        RunMode::Once => scheduler.run().await,
        RunMode::Loop { interval } => {
            tracing::info!("=== 반복 모드 시작 (주기: {}초) ===", interval.as_secs());
            tokio::select! {
                _ = scheduler.run() => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("종료 신호 수신, 수집기 종료 중...");
                }
            }
        }
    }

    if let Some(pg) = pg_store {
        pg.close().await;
    }
    tracing::info!("Coin Collector 종료");

    Ok(())
}
