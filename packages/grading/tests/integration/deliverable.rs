use std::collections::HashSet;
use std::sync::Arc;

use grading::error::ServiceError;
use grading::extraction::UnknownNameExtractor;
use grading::models::{DeliverableUpdate, MarkStatus, NewDeliverable, RecordId, UNKNOWN_STUDENT};
use grading::services::DeliverableUpload;

use crate::common::{ScriptedExtractor, memory_stack, memory_stack_with, pdf_bytes};

fn submission(filename: &str) -> DeliverableUpload {
    DeliverableUpload::new(filename, pdf_bytes(filename), "application/pdf")
}

#[tokio::test]
async fn grading_workflow_end_to_end() {
    let stack = memory_stack();
    let assignments = &stack.state.assignments;
    let deliverables = &stack.state.deliverables;

    let assignment_id = assignments
        .create_assignment("Grading Test", 0.85)
        .await
        .unwrap()
        .to_hex();
    assignments
        .upload_rubric(
            &assignment_id,
            "rubric.pdf",
            pdf_bytes("rubric"),
            "application/pdf",
        )
        .await
        .unwrap();

    let deliverable_id = deliverables
        .upload_deliverable(&assignment_id, submission("submission.pdf"), false)
        .await
        .unwrap()
        .to_hex();
    let deliverable = deliverables
        .get_deliverable(&deliverable_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(deliverable.student_name, UNKNOWN_STUDENT);
    assert_eq!(deliverable.mark, None);
    assert_eq!(deliverable.mark_status(), MarkStatus::Unmarked);
    assert_eq!(deliverable.extension, "pdf");

    let updated = deliverables
        .update_deliverable(
            &deliverable_id,
            DeliverableUpdate {
                mark: Some(8.5),
                certainty_threshold: Some(0.9),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated);

    let deliverable = deliverables
        .get_deliverable(&deliverable_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(deliverable.mark, Some(8.5));
    assert_eq!(deliverable.certainty_threshold, Some(0.9));
    assert_eq!(deliverable.mark_status(), MarkStatus::Marked);
    let rendered = serde_json::to_value(&deliverable).unwrap();
    assert_eq!(rendered["mark_status"], "Marked");

    assert!(assignments.delete_assignment(&assignment_id).await.unwrap());
    let err = deliverables
        .download_deliverable(&deliverable_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn updating_mark_leaves_other_fields_alone() {
    let stack = memory_stack();
    let deliverables = &stack.state.deliverables;
    let assignment_id = stack
        .state
        .assignments
        .create_assignment("Essay", 0.5)
        .await
        .unwrap()
        .to_hex();
    let id = deliverables
        .upload_deliverable(&assignment_id, submission("s.pdf"), false)
        .await
        .unwrap()
        .to_hex();

    deliverables
        .update_deliverable(
            &id,
            DeliverableUpdate {
                student_name: Some("Ada Lovelace".into()),
                certainty_threshold: Some(0.75),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    deliverables
        .update_deliverable(
            &id,
            DeliverableUpdate {
                mark: Some(7.333),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let deliverable = deliverables.get_deliverable(&id).await.unwrap().unwrap();
    assert_eq!(deliverable.mark, Some(7.33));
    assert_eq!(deliverable.student_name, "Ada Lovelace");
    assert_eq!(deliverable.certainty_threshold, Some(0.75));
}

#[tokio::test]
async fn empty_update_on_existing_deliverable_is_noop() {
    let stack = memory_stack();
    let deliverables = &stack.state.deliverables;
    let assignment_id = stack
        .state
        .assignments
        .create_assignment("Essay", 0.5)
        .await
        .unwrap()
        .to_hex();
    let id = deliverables
        .upload_deliverable(&assignment_id, submission("s.pdf"), false)
        .await
        .unwrap()
        .to_hex();
    let before = deliverables.get_deliverable(&id).await.unwrap().unwrap();

    let updated = deliverables
        .update_deliverable(&id, DeliverableUpdate::default())
        .await
        .unwrap();
    assert!(!updated);

    let after = deliverables.get_deliverable(&id).await.unwrap().unwrap();
    assert_eq!(after.updated_at, before.updated_at);
}

#[tokio::test]
async fn update_of_missing_deliverable_is_false() {
    let stack = memory_stack();
    let deliverables = &stack.state.deliverables;

    for id in [RecordId::generate().to_hex(), "garbage".to_owned()] {
        let updated = deliverables
            .update_deliverable(
                &id,
                DeliverableUpdate {
                    mark: Some(5.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated, "{id}");
    }
}

#[tokio::test]
async fn out_of_range_updates_are_rejected_without_writing() {
    let stack = memory_stack();
    let deliverables = &stack.state.deliverables;
    let assignment_id = stack
        .state
        .assignments
        .create_assignment("Essay", 0.5)
        .await
        .unwrap()
        .to_hex();
    let id = deliverables
        .upload_deliverable(&assignment_id, submission("s.pdf"), false)
        .await
        .unwrap()
        .to_hex();

    let rejected = [
        DeliverableUpdate {
            mark: Some(10.5),
            ..Default::default()
        },
        DeliverableUpdate {
            mark: Some(-1.0),
            ..Default::default()
        },
        DeliverableUpdate {
            certainty_threshold: Some(1.5),
            ..Default::default()
        },
        DeliverableUpdate {
            student_name: Some("   ".into()),
            mark: Some(5.0),
            ..Default::default()
        },
    ];
    for update in rejected {
        let err = deliverables
            .update_deliverable(&id, update.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)), "{update:?}");
    }

    let deliverable = deliverables.get_deliverable(&id).await.unwrap().unwrap();
    assert_eq!(deliverable.mark, None);
    assert_eq!(deliverable.student_name, UNKNOWN_STUDENT);
}

#[tokio::test]
async fn pdf_uploads_run_name_extraction() {
    let extractor = ScriptedExtractor::new("Name: Grace Hopper", Some("Grace Hopper\nEssay"));
    let stack = memory_stack_with(u64::MAX, extractor.clone());
    let assignment_id = stack
        .state
        .assignments
        .create_assignment("Essay", 0.5)
        .await
        .unwrap()
        .to_hex();

    let id = stack
        .state
        .deliverables
        .upload_deliverable(&assignment_id, submission("grace.pdf"), true)
        .await
        .unwrap();
    let deliverable = stack
        .state
        .deliverables
        .get_deliverable(&id.to_hex())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(deliverable.student_name, "Grace Hopper");
    assert_eq!(
        deliverable.extracted_text.as_deref(),
        Some("Grace Hopper\nEssay")
    );
    assert_eq!(extractor.calls(), 1);
}

#[tokio::test]
async fn extraction_is_skipped_when_disabled_or_not_pdf() {
    let extractor = ScriptedExtractor::new("Grace Hopper", None);
    let stack = memory_stack_with(u64::MAX, extractor.clone());
    let assignment_id = stack
        .state
        .assignments
        .create_assignment("Essay", 0.5)
        .await
        .unwrap()
        .to_hex();
    let deliverables = &stack.state.deliverables;

    let disabled = deliverables
        .upload_deliverable(&assignment_id, submission("a.pdf"), false)
        .await
        .unwrap();
    let docx = deliverables
        .upload_deliverable(
            &assignment_id,
            DeliverableUpload::new(
                "b.docx",
                b"PK docx".to_vec(),
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            ),
            true,
        )
        .await
        .unwrap();

    for id in [disabled, docx] {
        let deliverable = deliverables
            .get_deliverable(&id.to_hex())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(deliverable.student_name, UNKNOWN_STUDENT);
        assert!(deliverable.extracted_text.is_none());
    }
    assert_eq!(extractor.calls(), 0);
}

#[tokio::test]
async fn upload_to_missing_assignment_is_not_found() {
    let stack = memory_stack();
    for assignment_id in [RecordId::generate().to_hex(), "nope".to_owned()] {
        let err = stack
            .state
            .deliverables
            .upload_deliverable(&assignment_id, submission("s.pdf"), false)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
    assert!(stack.blobs.is_empty());
}

#[tokio::test]
async fn batch_upload_skips_failed_items() {
    let stack = memory_stack_with(1024, Arc::new(UnknownNameExtractor));
    let assignment_id = stack
        .state
        .assignments
        .create_assignment("Essay", 0.5)
        .await
        .unwrap()
        .to_hex();

    let uploads = vec![
        submission("first.pdf"),
        DeliverableUpload::new("huge.pdf", vec![0u8; 4096], "application/pdf"),
        submission("third.pdf"),
    ];
    let ids = stack
        .state
        .deliverables
        .upload_multiple_deliverables(&assignment_id, uploads, false)
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);

    let listed: Vec<String> = stack
        .state
        .deliverables
        .list_deliverables(&assignment_id)
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.filename)
        .collect();
    assert_eq!(listed, vec!["first.pdf", "third.pdf"]);
}

#[tokio::test]
async fn batch_upload_to_missing_assignment_fails() {
    let stack = memory_stack();
    let err = stack
        .state
        .deliverables
        .upload_multiple_deliverables(
            &RecordId::generate().to_hex(),
            vec![submission("s.pdf")],
            false,
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn delete_unlinks_and_removes_payload() {
    let stack = memory_stack();
    let assignment_id = stack
        .state
        .assignments
        .create_assignment("Essay", 0.5)
        .await
        .unwrap()
        .to_hex();
    let deliverables = &stack.state.deliverables;
    let keep = deliverables
        .upload_deliverable(&assignment_id, submission("keep.pdf"), false)
        .await
        .unwrap();
    let removed = deliverables
        .upload_deliverable(&assignment_id, submission("drop.pdf"), false)
        .await
        .unwrap();
    assert_eq!(stack.blobs.len(), 2);

    assert!(deliverables.delete_deliverable(&removed.to_hex()).await.unwrap());

    let assignment = stack
        .state
        .assignments
        .get_assignment(&assignment_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(assignment.deliverable_ids, vec![keep]);
    assert_eq!(stack.blobs.len(), 1);
    assert!(deliverables.get_deliverable(&removed.to_hex()).await.unwrap().is_none());

    assert!(!deliverables.delete_deliverable(&removed.to_hex()).await.unwrap());
    assert!(!deliverables.delete_deliverable("garbage").await.unwrap());
}

#[tokio::test]
async fn delete_without_owning_assignment_reports_false_but_removes() {
    let stack = memory_stack();
    let id = stack
        .repository()
        .store_deliverable(NewDeliverable {
            assignment_id: RecordId::generate(),
            filename: "orphan.pdf".into(),
            content: pdf_bytes("orphan"),
            extension: "pdf".into(),
            content_type: "application/pdf".into(),
            student_name: UNKNOWN_STUDENT.into(),
            extracted_text: None,
        })
        .await
        .unwrap();
    assert_eq!(stack.blobs.len(), 1);

    let deleted = stack
        .state
        .deliverables
        .delete_deliverable(&id.to_hex())
        .await
        .unwrap();
    assert!(!deleted);
    assert!(stack.blobs.is_empty());
    assert!(
        stack
            .state
            .deliverables
            .get_deliverable(&id.to_hex())
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_uploads_keep_every_sibling_id() {
    let stack = memory_stack();
    let assignment_id = stack
        .state
        .assignments
        .create_assignment("Essay", 0.5)
        .await
        .unwrap()
        .to_hex();
    let deliverables = stack.state.deliverables.clone();

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let deliverables = Arc::clone(&deliverables);
            let assignment_id = assignment_id.clone();
            tokio::spawn(async move {
                deliverables
                    .upload_deliverable(&assignment_id, submission(&format!("s{i}.pdf")), false)
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut uploaded = HashSet::new();
    for handle in handles {
        uploaded.insert(handle.await.unwrap());
    }

    let assignment = stack
        .state
        .assignments
        .get_assignment(&assignment_id)
        .await
        .unwrap()
        .unwrap();
    let linked: HashSet<RecordId> = assignment.deliverable_ids.into_iter().collect();
    assert_eq!(linked, uploaded);
    assert_eq!(linked.len(), 20);
}
