use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Error};
use ciborium::Value;
use clap::Parser;
use clap_stdin::MaybeStdin;
use mdoc_transfer::{
    cbor,
    definitions::{
        x509::{
            trust_anchor::{PemTrustAnchor, TrustAnchorRegistry},
            X5Chain,
        },
        device_request::Namespaces,
        DeviceRequest, ParsedDeviceRequest,
    },
    presentation::{
        self, DeviceRequestProcessor, InMemoryDocumentStore, ProcessedRequest, ReaderTrustStore,
        StoredDocument, X509ReaderTrustStore,
    },
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    action: Action,
}

#[derive(Debug, clap::Subcommand)]
enum Action {
    /// Print the contents of a device request.
    Inspect {
        /// Base64 encoded DeviceRequest.
        device_request: MaybeStdin<String>,
        /// Base64 encoded SessionTranscript the request was received in.
        #[arg(long)]
        session_transcript: String,
        /// Path to a JSON list of trust anchors, used to check the reader certificate chains.
        #[arg(long)]
        trust_anchors: Option<PathBuf>,
    },
    /// Match a device request against a set of held documents.
    Process {
        /// Base64 encoded DeviceRequest.
        device_request: MaybeStdin<String>,
        /// Base64 encoded SessionTranscript the request was received in.
        #[arg(long)]
        session_transcript: String,
        /// Path to a JSON list of held documents.
        #[arg(long)]
        documents: PathBuf,
        /// Path to a JSON list of trust anchors, used to check the reader certificate chains.
        #[arg(long)]
        trust_anchors: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    match Args::parse().action {
        Action::Inspect {
            device_request,
            session_transcript,
            trust_anchors,
        } => inspect(
            &device_request.to_string(),
            &session_transcript,
            trust_anchors,
        ),
        Action::Process {
            device_request,
            session_transcript,
            documents,
            trust_anchors,
        } => process(
            &device_request.to_string(),
            &session_transcript,
            documents,
            trust_anchors,
        )
        .await,
    }
}

#[derive(Debug, Serialize)]
struct DocRequestSummary {
    doc_type: String,
    /// In request order.
    namespaces: Namespaces,
    reader_common_name: Option<String>,
    reader_signature_is_valid: Option<bool>,
    reader_certificate_is_trusted: Option<bool>,
    zk_system_ids: Vec<String>,
}

fn load_trust_store(path: Option<PathBuf>) -> Result<Option<X509ReaderTrustStore>, Error> {
    let Some(path) = path else {
        return Ok(None);
    };
    let anchors: Vec<PemTrustAnchor> = serde_json::from_slice(&fs::read(&path)?)
        .with_context(|| format!("could not parse trust anchors from {}", path.display()))?;
    let registry = TrustAnchorRegistry::from_pem_anchors(anchors)?;
    Ok(Some(X509ReaderTrustStore::new(registry)))
}

fn inspect(
    device_request: &str,
    session_transcript: &str,
    trust_anchors: Option<PathBuf>,
) -> Result<(), Error> {
    let request: DeviceRequest = cbor::from_slice(
        &base64::decode(device_request.trim()).context("device request is not base64")?,
    )
    .context("could not decode device request")?;
    let transcript: Value = cbor::from_slice(
        &base64::decode(session_transcript.trim()).context("session transcript is not base64")?,
    )
    .context("could not decode session transcript")?;
    let trust_store = load_trust_store(trust_anchors)?;

    let parsed = ParsedDeviceRequest::new(request, transcript);
    let summaries = parsed
        .doc_requests()
        .iter()
        .enumerate()
        .map(|(index, doc_request)| {
            let items_request = doc_request.items_request.as_ref();
            let chain = doc_request
                .reader_auth
                .as_ref()
                .and_then(|reader_auth| reader_auth.x5chain())
                .and_then(|value| X5Chain::from_cbor(value).ok());
            DocRequestSummary {
                doc_type: items_request.doc_type.clone(),
                namespaces: items_request.namespaces.clone(),
                reader_common_name: chain
                    .as_ref()
                    .map(|chain| chain.end_entity_common_name().to_string()),
                reader_signature_is_valid: doc_request
                    .reader_auth
                    .as_ref()
                    .map(|_| parsed.reader_auth_outcome(index).is_ok()),
                reader_certificate_is_trusted: chain.as_ref().and_then(|chain| {
                    trust_store
                        .as_ref()
                        .map(|store| store.validate_certification_trust_path(chain))
                }),
                zk_system_ids: items_request
                    .zk_request()
                    .map(|zk| zk.system_specs.into_iter().map(|spec| spec.id).collect())
                    .unwrap_or_default(),
            }
        })
        .collect::<Vec<_>>();

    let output = serde_json::json!({
        "version": parsed.request.version,
        "doc_requests": summaries,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[derive(Debug, Serialize)]
struct RequestedDocumentSummary {
    document_id: String,
    requested_items: Vec<(String, String, bool)>,
    reader_common_name: Option<String>,
    reader_signature_is_valid: Option<bool>,
    reader_certificate_is_trusted: Option<bool>,
    zk_system_id: Option<String>,
}

async fn process(
    device_request: &str,
    session_transcript: &str,
    documents: PathBuf,
    trust_anchors: Option<PathBuf>,
) -> Result<(), Error> {
    let documents: Vec<StoredDocument> = serde_json::from_slice(&fs::read(&documents)?)
        .with_context(|| format!("could not parse documents from {}", documents.display()))?;
    let store = InMemoryDocumentStore::new(documents);
    let mut processor = DeviceRequestProcessor::new(Arc::new(store));
    if let Some(trust_store) = load_trust_store(trust_anchors)? {
        processor = processor.with_reader_trust_store(Arc::new(trust_store));
    }

    let request = presentation::DeviceRequest::new(
        base64::decode(device_request.trim()).context("device request is not base64")?,
        base64::decode(session_transcript.trim()).context("session transcript is not base64")?,
    );
    let processed = match processor.process(request.into()).await {
        ProcessedRequest::Success(processed) => processed,
        ProcessedRequest::Failure(e) => return Err(e).context("could not process device request"),
    };

    let summaries = processed
        .requested_documents
        .into_iter()
        .map(|document| RequestedDocumentSummary {
            document_id: document.document_id.to_string(),
            requested_items: document
                .requested_items
                .into_iter()
                .map(|(item, retain)| (item.namespace, item.element_identifier, retain))
                .collect(),
            reader_common_name: document
                .reader_auth
                .as_ref()
                .map(|auth| auth.reader_common_name.clone()),
            reader_signature_is_valid: document
                .reader_auth
                .as_ref()
                .map(|auth| auth.reader_sign_is_valid),
            reader_certificate_is_trusted: document
                .reader_auth
                .as_ref()
                .map(|auth| auth.reader_certificate_is_trusted),
            zk_system_id: document.matched_zk_system.map(|matched| matched.spec.id),
        })
        .collect::<Vec<_>>();
    println!("{}", serde_json::to_string_pretty(&summaries)?);
    Ok(())
}
