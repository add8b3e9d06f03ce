use std::sync::Arc;

use alloy_primitives::U256;
use axum::{
    Json,
    extract::{Multipart, Path, Query, State, multipart::MultipartError},
    http::StatusCode,
};
use chain::{
    Fetch, NftReader,
    metadata::fetch_metadata,
    view::{LeaderboardRow, MemeView, NftView},
};
use tracing::info;

use crate::{
    error::AppError,
    payloads::{
        ContestResponse, DashboardResponse, Health, LeaderboardQuery, Loaded, MemeDetailResponse,
        MetadataResponse, NftsResponse, StakeResponse, StatsResponse,
    },
    pinata::{Pinned, Upload, pin_file},
    state::AppState,
    utils::{now, parse_address, validate_upload},
};

pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Pinned>, AppError> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(read_error)?;

        upload = Some((file_name, content_type, bytes));
        break;
    }

    let (file_name, content_type, bytes) = upload.ok_or(AppError::MissingFile)?;
    let content_type = validate_upload(content_type.as_deref(), bytes.len())?;

    let jwt = state
        .config
        .pinata_jwt
        .as_deref()
        .ok_or(AppError::PinningNotConfigured)?;

    info!("Uploading {file_name} ({content_type}, {} bytes)", bytes.len());

    let pinned = pin_file(
        &state.client,
        &state.config.pinata_endpoint,
        jwt,
        &state.config.ipfs_gateway,
        Upload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        },
    )
    .await?;

    Ok(Json(pinned))
}

/// Bodies over the limit can fail on any read, not just the file field.
fn read_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::FileTooLarge
    } else {
        AppError::MalformedPayload
    }
}

pub async fn memes_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Loaded<MemeView>>, AppError> {
    let listing = state.aggregator.list_memes().await?;
    let gateway = &state.config.ipfs_gateway;

    Ok(Json(Loaded::from_listing(listing, |meme| {
        MemeView::new(&meme, gateway)
    })))
}

pub async fn meme_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<MemeDetailResponse>, AppError> {
    let detail = state
        .aggregator
        .meme_detail(id, now())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Meme {id}")))?;

    Ok(Json(MemeDetailResponse::new(
        detail,
        &state.config.ipfs_gateway,
    )))
}

pub async fn stake_handler(
    State(state): State<Arc<AppState>>,
    Path((id, address)): Path<(u64, String)>,
) -> Result<Json<StakeResponse>, AppError> {
    let user = parse_address(&address)?;

    let position = state
        .aggregator
        .stake_of(id, user)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Meme {id}")))?;

    Ok(Json(StakeResponse {
        meme_id: id,
        user: user.to_string(),
        amount: position.amount.into(),
    }))
}

pub async fn leaderboard_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Loaded<LeaderboardRow>>, AppError> {
    let leaderboard = state.aggregator.leaderboard(query.by, query.limit).await?;
    let gateway = &state.config.ipfs_gateway;

    Ok(Json(Loaded::from_listing(leaderboard, |ranked| {
        LeaderboardRow::new(&ranked, gateway)
    })))
}

pub async fn contest_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ContestResponse>, AppError> {
    let overview = state
        .aggregator
        .contest_overview(now())
        .await?
        .ok_or_else(|| AppError::NotFound("Contest".to_string()))?;

    Ok(Json(ContestResponse::new(
        overview,
        &state.config.ipfs_gateway,
    )))
}

pub async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<DashboardResponse>, AppError> {
    let user = parse_address(&address)?;
    let dashboard = state.aggregator.user_dashboard(user).await?;

    Ok(Json(DashboardResponse::new(
        dashboard,
        &state.config.ipfs_gateway,
    )))
}

pub async fn nfts_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<NftsResponse>, AppError> {
    let owner = parse_address(&address)?;
    let (listing, stats) = state.aggregator.user_nfts(owner).await?;
    let gateway = &state.config.ipfs_gateway;

    Ok(Json(NftsResponse {
        owner: owner.to_string(),
        nfts: Loaded::from_listing(listing, |nft| NftView::new(&nft, gateway)),
        stats: stats.into(),
    }))
}

pub async fn metadata_handler(
    State(state): State<Arc<AppState>>,
    Path(token_id): Path<String>,
) -> Result<Json<MetadataResponse>, AppError> {
    let token_id: U256 = token_id
        .parse()
        .map_err(|_| AppError::MalformedPayload)?;
    let reader = state.aggregator.reader();

    if reader.winner_info(token_id).await.into_result()?.is_none() {
        return Err(AppError::NotFound(format!("Token {token_id}")));
    }

    let token_uri = reader.token_uri(token_id).await?;
    let fetched = fetch_metadata(&state.client, &token_uri, &state.config.ipfs_gateway).await;
    let metadata = match fetched {
        Fetch::Found(metadata) => Some(metadata),
        Fetch::NotFound => None,
        Fetch::Failed(e) => return Err(AppError::MetadataUnavailable(e.to_string())),
    };

    Ok(Json(MetadataResponse {
        token_id: token_id.to_string(),
        token_uri,
        metadata,
    }))
}

pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, AppError> {
    let stats = state.aggregator.platform_stats().await?;

    Ok(Json(stats.into()))
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        chain_id: state.config.chain_id,
    })
}
