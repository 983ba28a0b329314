use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use common::storage::memory::MemoryBlobStore;
use grading::config::AppConfig;
use grading::extraction::{NameExtraction, NameExtractor, UnknownNameExtractor};
use grading::repository::{MemoryRepository, PayloadStore, Repository};
use grading::state::AppState;

/// A fresh in-memory stack. Every test builds its own.
pub struct TestStack {
    pub state: AppState,
    pub memory: Arc<MemoryRepository>,
    pub blobs: Arc<MemoryBlobStore>,
}

impl TestStack {
    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.state.repository
    }
}

pub fn memory_stack() -> TestStack {
    memory_stack_with(u64::MAX, Arc::new(UnknownNameExtractor))
}

pub fn memory_stack_with(max_blob_size: u64, extractor: Arc<dyn NameExtractor>) -> TestStack {
    let blobs = Arc::new(MemoryBlobStore::new(max_blob_size));
    let payloads = PayloadStore::new(blobs.clone(), 0);
    let memory = Arc::new(MemoryRepository::new(payloads));
    let repository: Arc<dyn Repository> = memory.clone();
    let state = AppState::new(AppConfig::in_memory(), repository, extractor);
    TestStack {
        state,
        memory,
        blobs,
    }
}

pub fn pdf_bytes(label: &str) -> Vec<u8> {
    format!("%PDF-1.4\n1 0 obj << /Title ({label}) >> endobj\n%%EOF").into_bytes()
}

/// Returns a fixed answer and counts how often it was asked.
pub struct ScriptedExtractor {
    answer: NameExtraction,
    calls: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn new(student_name: &str, extracted_text: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            answer: NameExtraction {
                student_name: student_name.to_owned(),
                extracted_text: extracted_text.map(str::to_owned),
            },
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NameExtractor for ScriptedExtractor {
    async fn extract_student_name(&self, _document: &[u8]) -> NameExtraction {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}
