//! Engine worker - owns the decoding engine and every open document

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use flume::{Receiver, Sender};
use log::{debug, info};

use super::cache::{CacheKey, RasterCache};
use super::engine::{DocumentEngine, EngineDocument, expand_worker_src};
use super::request::{EngineFault, EngineRequest, EngineResponse, RequestId, WorkerOptions};
use super::types::{DocumentHandle, DocumentId, PageHandle, Viewport};

struct OpenDocument {
    handle: DocumentHandle,
    inner: Box<dyn EngineDocument>,
}

/// Main worker function - runs in a dedicated thread.
///
/// Requests are served strictly in arrival order, so page fetches and draws issued in
/// ascending page order complete in that order.
#[expect(
    clippy::needless_pass_by_value,
    reason = "Values moved into thread, need ownership"
)]
pub fn engine_worker<E: DocumentEngine>(
    mut engine: E,
    requests: Receiver<EngineRequest>,
    responses: Sender<EngineResponse>,
    cache: Arc<Mutex<RasterCache>>,
) {
    let mut documents: HashMap<DocumentId, OpenDocument> = HashMap::new();
    let mut next_document_id = 1u64;

    for request in requests {
        match request {
            EngineRequest::Configure(options) => {
                let src = expand_worker_src(&options.src, &engine.version());
                info!("Configuring engine worker endpoint: {src}");
                engine.configure(&WorkerOptions { src });
            }

            EngineRequest::Open { id, params } if params.locator.trim().is_empty() => {
                let _ = responses.send(EngineResponse::Error {
                    id,
                    error: EngineFault::UnsupportedLocator("empty locator".to_string()),
                });
            }

            EngineRequest::Open { id, params } => match engine.open(&params) {
                Ok(inner) => {
                    let handle = DocumentHandle {
                        id: DocumentId(next_document_id),
                        page_count: inner.page_count(),
                        locator: params.locator.clone(),
                    };
                    next_document_id += 1;
                    documents.insert(
                        handle.id,
                        OpenDocument {
                            handle: handle.clone(),
                            inner,
                        },
                    );
                    let _ = responses.send(EngineResponse::Opened {
                        id,
                        document: handle,
                    });
                }
                Err(error) => {
                    let _ = responses.send(EngineResponse::Error { id, error });
                }
            },

            EngineRequest::FetchPage {
                id,
                document,
                number,
            } => {
                let response = match fetch_page(&documents, document, number) {
                    Ok(page) => EngineResponse::Page { id, page },
                    Err(error) => EngineResponse::Error { id, error },
                };
                let _ = responses.send(response);
            }

            EngineRequest::Draw {
                id,
                document,
                number,
                viewport,
                density,
            } => {
                handle_draw_request(
                    &documents,
                    DrawTarget {
                        id,
                        document,
                        number,
                        viewport,
                        density,
                    },
                    &cache,
                    &responses,
                );
            }

            EngineRequest::Release(document) => {
                if let Some(released) = documents.remove(&document) {
                    debug!("Released document {}", released.handle.locator);
                }
                cache
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .invalidate_document(document);
            }

            EngineRequest::Shutdown => break,
        }
    }
}

fn fetch_page(
    documents: &HashMap<DocumentId, OpenDocument>,
    document: DocumentId,
    number: usize,
) -> Result<PageHandle, EngineFault> {
    let open = documents
        .get(&document)
        .ok_or(EngineFault::UnknownDocument(document))?;
    let info = open.inner.page(number)?;
    Ok(PageHandle::new(document, number, info))
}

struct DrawTarget {
    id: RequestId,
    document: DocumentId,
    number: usize,
    viewport: Viewport,
    density: f32,
}

fn handle_draw_request(
    documents: &HashMap<DocumentId, OpenDocument>,
    target: DrawTarget,
    cache: &Arc<Mutex<RasterCache>>,
    responses: &Sender<EngineResponse>,
) {
    let DrawTarget {
        id,
        document,
        number,
        viewport,
        density,
    } = target;
    let key = CacheKey::new(document, number, &viewport, density);

    let cached = cache
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .get(&key);
    if let Some(raster) = cached {
        debug!("Raster cache hit for page {number}");
        let _ = responses.send(EngineResponse::Drawn { id, raster });
        return;
    }

    let Some(open) = documents.get(&document) else {
        let _ = responses.send(EngineResponse::Error {
            id,
            error: EngineFault::UnknownDocument(document),
        });
        return;
    };

    match open.inner.draw(number, &viewport, density) {
        Ok(raster) => {
            let raster = cache
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .insert(key, raster);
            let _ = responses.send(EngineResponse::Drawn { id, raster });
        }
        Err(error) => {
            let _ = responses.send(EngineResponse::Error { id, error });
        }
    }
}
