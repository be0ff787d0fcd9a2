// src/handlers.rs
use crate::{AppState, errors::ArchitectError, models::*};
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, http::header, web};
use futures_util::TryStreamExt;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct TargetModeRequest {
    pub mode: TargetMode,
}

#[derive(Debug, Deserialize)]
pub struct CreativityLevelRequest {
    pub level: CreativityLevel,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisEdit {
    pub field: AnalysisField,
    pub value: FieldValue,
}

#[derive(Debug, Deserialize)]
pub struct PromptEdit {
    pub field: PromptField,
    pub value: String,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/session", web::get().to(get_session))
            .route("/reference", web::post().to(select_reference))
            .route("/reference", web::delete().to(clear_reference))
            .route("/target", web::post().to(select_target))
            .route("/target", web::delete().to(clear_target))
            .route("/target-mode", web::put().to(set_target_mode))
            .route("/creativity-level", web::put().to(set_creativity_level))
            .route("/analysis", web::patch().to(edit_analysis))
            .route("/prompts", web::patch().to(edit_prompts))
            .route("/regenerate", web::post().to(regenerate_prompts))
            .route("/previews/{preview_id}", web::get().to(get_preview)),
    );
}

/// Reads the first non-empty file field of the upload.
async fn read_image(mut payload: Multipart) -> Result<ImageInput, Error> {
    while let Some(mut field) = payload.try_next().await? {
        let filename = field
            .content_disposition()
            .get_filename()
            .map(|name| name.to_string());

        let content_type = field
            .content_type()
            .map(|ct| ct.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut image_data = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            image_data.extend_from_slice(&chunk);
        }

        if image_data.is_empty() {
            continue;
        }

        let image = ImageInput::new(content_type, image_data);
        return Ok(match filename {
            Some(name) => image.with_filename(name),
            None => image,
        });
    }

    Err(ArchitectError::Validation("No image provided".to_string()).into())
}

async fn snapshot(data: &web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.controller.snapshot().await)
}

pub async fn get_session(data: web::Data<AppState>) -> HttpResponse {
    snapshot(&data).await
}

pub async fn select_reference(
    payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let image = read_image(payload).await?;
    data.controller.select_reference(image).await;
    Ok(snapshot(&data).await)
}

pub async fn select_target(
    payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let image = read_image(payload).await?;
    data.controller.select_target(image).await;
    Ok(snapshot(&data).await)
}

pub async fn clear_reference(data: web::Data<AppState>) -> HttpResponse {
    data.controller.clear_reference().await;
    snapshot(&data).await
}

pub async fn clear_target(data: web::Data<AppState>) -> HttpResponse {
    data.controller.clear_target().await;
    snapshot(&data).await
}

pub async fn set_target_mode(
    data: web::Data<AppState>,
    body: web::Json<TargetModeRequest>,
) -> HttpResponse {
    data.controller.set_target_mode(body.mode).await;
    snapshot(&data).await
}

pub async fn set_creativity_level(
    data: web::Data<AppState>,
    body: web::Json<CreativityLevelRequest>,
) -> HttpResponse {
    data.controller.set_creativity_level(body.level).await;
    snapshot(&data).await
}

pub async fn edit_analysis(
    data: web::Data<AppState>,
    body: web::Json<AnalysisEdit>,
) -> Result<HttpResponse, Error> {
    let AnalysisEdit { field, value } = body.into_inner();
    data.controller.edit_analysis_field(field, value).await?;
    Ok(snapshot(&data).await)
}

pub async fn edit_prompts(
    data: web::Data<AppState>,
    body: web::Json<PromptEdit>,
) -> Result<HttpResponse, Error> {
    let PromptEdit { field, value } = body.into_inner();
    data.controller.edit_prompt_field(field, value).await?;
    Ok(snapshot(&data).await)
}

pub async fn regenerate_prompts(data: web::Data<AppState>) -> HttpResponse {
    data.controller.regenerate_prompts().await;
    snapshot(&data).await
}

pub async fn get_preview(path: web::Path<Uuid>, data: web::Data<AppState>) -> HttpResponse {
    let preview_id = path.into_inner();

    match data.controller.previews().get(&preview_id) {
        Some(entry) => HttpResponse::Ok()
            .content_type(entry.media_type)
            .insert_header((
                header::LAST_MODIFIED,
                entry
                    .created_at
                    .format("%a, %d %b %Y %H:%M:%S GMT")
                    .to_string(),
            ))
            .body(entry.data),
        None => HttpResponse::NotFound().json(serde_json::json!({
            "error": "Preview not found",
            "message": format!("No preview with id {}", preview_id)
        })),
    }
}
