use std::collections::HashSet;
use std::sync::Arc;

use grading::error::ServiceError;
use grading::models::{AssignmentUpdate, FileType, NewFile, RecordId};
use grading::repository::Collection;
use serde_json::json;

use crate::common::{memory_stack, pdf_bytes};

#[tokio::test]
async fn create_then_get_round_trips() {
    let stack = memory_stack();
    let service = &stack.state.assignments;

    for (name, threshold, stored) in [
        ("Essay", 0.85, 0.85),
        ("Lab report", 0.857, 0.86),
        ("Edge low", 0.0, 0.0),
        ("Edge high", 1.0, 1.0),
    ] {
        let id = service.create_assignment(name, threshold).await.unwrap();
        let assignment = service
            .get_assignment(&id.to_hex())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(assignment.id, id);
        assert_eq!(assignment.name, name);
        assert_eq!(assignment.confidence_threshold, stored);
        assert!(assignment.rubric_ids.is_empty());
        assert!(assignment.relevant_document_ids.is_empty());
        assert!(assignment.deliverable_ids.is_empty());
    }
}

#[tokio::test]
async fn invalid_input_is_rejected_before_storage() {
    let stack = memory_stack();
    let service = &stack.state.assignments;

    for (name, threshold) in [
        ("Test".to_owned(), 1.5),
        ("Test".to_owned(), -0.1),
        (String::new(), 0.5),
        ("a".repeat(256), 0.5),
    ] {
        let err = service
            .create_assignment(&name, threshold)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)), "{name:?} {threshold}");
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
    assert!(service.list_assignments().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_and_unknown_ids_read_as_absent() {
    let stack = memory_stack();
    let service = &stack.state.assignments;

    assert!(service.get_assignment("not-an-id").await.unwrap().is_none());
    assert!(
        service
            .get_assignment(&RecordId::generate().to_hex())
            .await
            .unwrap()
            .is_none()
    );
    assert!(!service.delete_assignment("not-an-id").await.unwrap());
}

#[tokio::test]
async fn listing_is_in_creation_order() {
    let stack = memory_stack();
    let service = &stack.state.assignments;

    let mut created = Vec::new();
    for name in ["First", "Second", "Third"] {
        created.push(service.create_assignment(name, 0.5).await.unwrap());
    }

    let listed: Vec<RecordId> = service
        .list_assignments()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(listed, created);
}

#[tokio::test]
async fn listing_skips_malformed_record() {
    let stack = memory_stack();
    let good = stack
        .state
        .assignments
        .create_assignment("Well formed", 0.5)
        .await
        .unwrap();
    stack
        .memory
        .insert_raw_document(
            Collection::Assignments,
            json!({
                "id": "0190a5c47b2e70008000000000000000",
                "name": "Half written",
                "confidence_threshold": "high",
            }),
        )
        .await;

    let listed = stack.state.assignments.list_assignments().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, good);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_yield_distinct_ids() {
    let stack = memory_stack();
    let service = stack.state.assignments.clone();

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .create_assignment(&format!("Assignment {i}"), 0.5)
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap());
    }
    assert_eq!(ids.len(), 32);

    for id in &ids {
        assert!(service.get_assignment(&id.to_hex()).await.unwrap().is_some());
    }
}

#[tokio::test]
async fn update_changes_only_supplied_fields() {
    let stack = memory_stack();
    let service = &stack.state.assignments;
    let id = service.create_assignment("Draft", 0.7).await.unwrap();

    let renamed = service
        .update_assignment(
            &id.to_hex(),
            AssignmentUpdate {
                name: Some("Final".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(renamed);

    let assignment = service.get_assignment(&id.to_hex()).await.unwrap().unwrap();
    assert_eq!(assignment.name, "Final");
    assert_eq!(assignment.confidence_threshold, 0.7);
    assert!(assignment.updated_at >= assignment.created_at);

    let rethresholded = service
        .update_assignment(
            &id.to_hex(),
            AssignmentUpdate {
                confidence_threshold: Some(0.333),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(rethresholded);
    let assignment = service.get_assignment(&id.to_hex()).await.unwrap().unwrap();
    assert_eq!(assignment.name, "Final");
    assert_eq!(assignment.confidence_threshold, 0.33);
}

#[tokio::test]
async fn update_rejects_invalid_values_and_reports_noop() {
    let stack = memory_stack();
    let service = &stack.state.assignments;
    let id = service.create_assignment("Draft", 0.7).await.unwrap();

    let err = service
        .update_assignment(
            &id.to_hex(),
            AssignmentUpdate {
                confidence_threshold: Some(2.0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    assert!(
        !service
            .update_assignment(&id.to_hex(), AssignmentUpdate::default())
            .await
            .unwrap()
    );
    assert!(
        !service
            .update_assignment(
                &RecordId::generate().to_hex(),
                AssignmentUpdate {
                    name: Some("Ghost".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    );

    let assignment = service.get_assignment(&id.to_hex()).await.unwrap().unwrap();
    assert_eq!(assignment.confidence_threshold, 0.7);
}

#[tokio::test]
async fn files_are_linked_and_filtered_by_type() {
    let stack = memory_stack();
    let service = &stack.state.assignments;
    let id = service.create_assignment("Essay", 0.8).await.unwrap();
    let hex = id.to_hex();

    let rubric_a = service
        .upload_rubric(&hex, "rubric-a.pdf", pdf_bytes("a"), "application/pdf")
        .await
        .unwrap();
    let reference = service
        .upload_relevant_document(&hex, "notes.txt", b"lecture notes".to_vec(), "")
        .await
        .unwrap();
    let rubric_b = service
        .upload_rubric(&hex, "rubric-b.pdf", pdf_bytes("b"), "application/pdf")
        .await
        .unwrap();

    let assignment = service.get_assignment(&hex).await.unwrap().unwrap();
    assert_eq!(assignment.rubric_ids, vec![rubric_a, rubric_b]);
    assert_eq!(assignment.relevant_document_ids, vec![reference]);

    let rubrics: Vec<RecordId> = service
        .list_rubrics(&hex)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.id)
        .collect();
    assert_eq!(rubrics, vec![rubric_a, rubric_b]);

    let documents = service.list_relevant_documents(&hex).await.unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].file_type, FileType::RelevantDocument);
    assert_eq!(documents[0].content_type, "text/plain");
    assert!(documents[0].content.is_none());

    let file = service.download_file(&reference.to_hex()).await.unwrap();
    assert_eq!(file.content.as_deref(), Some(&b"lecture notes"[..]));
    assert_eq!(file.size, 13);
}

#[tokio::test]
async fn upload_to_missing_assignment_never_touches_blob_store() {
    let stack = memory_stack();
    let service = &stack.state.assignments;

    for assignment_id in [RecordId::generate().to_hex(), "not-an-id".to_owned()] {
        let err = service
            .upload_rubric(&assignment_id, "rubric.pdf", pdf_bytes("x"), "application/pdf")
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "{assignment_id}");
        assert_eq!(err.code(), "NOT_FOUND");
    }
    assert!(stack.blobs.is_empty());
}

#[tokio::test]
async fn repository_stores_file_for_vanished_assignment_without_linking() {
    let stack = memory_stack();
    let ghost = RecordId::generate();

    let id = stack
        .repository()
        .store_file(NewFile {
            assignment_id: ghost,
            filename: "orphan.pdf".into(),
            content: pdf_bytes("orphan"),
            content_type: "application/pdf".into(),
            file_type: FileType::Rubric,
        })
        .await
        .unwrap();

    let file = stack.repository().get_file(&id.to_hex()).await.unwrap().unwrap();
    assert_eq!(file.assignment_id, ghost);
    assert!(
        stack
            .repository()
            .get_assignment(&ghost.to_hex())
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn download_of_missing_file_is_not_found() {
    let stack = memory_stack();
    let err = stack
        .state
        .assignments
        .download_file(&RecordId::generate().to_hex())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn delete_cascades_to_children_and_blobs() {
    let stack = memory_stack();
    let assignments = &stack.state.assignments;
    let deliverables = &stack.state.deliverables;

    let id = assignments.create_assignment("Essay", 0.8).await.unwrap();
    let hex = id.to_hex();
    let keep = assignments.create_assignment("Other", 0.8).await.unwrap();
    let kept_rubric = assignments
        .upload_rubric(&keep.to_hex(), "keep.pdf", pdf_bytes("keep"), "application/pdf")
        .await
        .unwrap();

    let mut file_ids = Vec::new();
    for i in 0..3 {
        file_ids.push(
            assignments
                .upload_rubric(&hex, &format!("r{i}.pdf"), pdf_bytes("r"), "application/pdf")
                .await
                .unwrap(),
        );
    }
    file_ids.push(
        assignments
            .upload_relevant_document(&hex, "ref.pdf", pdf_bytes("ref"), "application/pdf")
            .await
            .unwrap(),
    );
    let mut deliverable_ids = Vec::new();
    for i in 0..2 {
        deliverable_ids.push(
            deliverables
                .upload_deliverable(
                    &hex,
                    grading::services::DeliverableUpload::new(
                        format!("s{i}.pdf"),
                        pdf_bytes("s"),
                        "application/pdf",
                    ),
                    false,
                )
                .await
                .unwrap(),
        );
    }
    assert_eq!(stack.blobs.len(), 7);

    assert!(assignments.delete_assignment(&hex).await.unwrap());

    let repo = stack.repository();
    assert!(repo.list_files_by_assignment(&hex, None).await.unwrap().is_empty());
    assert!(repo.list_deliverables_by_assignment(&hex).await.unwrap().is_empty());
    for file_id in &file_ids {
        assert!(repo.get_file(&file_id.to_hex()).await.unwrap().is_none());
    }
    for deliverable_id in &deliverable_ids {
        assert!(
            repo.get_deliverable(&deliverable_id.to_hex())
                .await
                .unwrap()
                .is_none()
        );
    }
    // Only the other assignment's rubric is left.
    assert_eq!(stack.blobs.len(), 1);
    assert!(repo.get_file(&kept_rubric.to_hex()).await.unwrap().is_some());

    assert!(!assignments.delete_assignment(&hex).await.unwrap());
}

#[tokio::test]
async fn delete_of_childless_assignment_succeeds() {
    let stack = memory_stack();
    let id = stack
        .state
        .assignments
        .create_assignment("Empty", 0.5)
        .await
        .unwrap();
    assert!(stack.state.assignments.delete_assignment(&id.to_hex()).await.unwrap());
    assert!(
        stack
            .state
            .assignments
            .get_assignment(&id.to_hex())
            .await
            .unwrap()
            .is_none()
    );
}
