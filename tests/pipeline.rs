mod support;

use std::sync::Arc;

use quizsmith_backend::config::Prompts;
use quizsmith_backend::domain::{Difficulty, EvaluationMethod, QuestionType, SkillType, SubjectiveQuestion, ValidatedQuestion};
use quizsmith_backend::error::{EvaluationRunError, GenerationError, IngestError};
use quizsmith_backend::evaluate::evaluate;
use quizsmith_backend::generation::Generator;
use quizsmith_backend::logic::{
    attempt_evaluations, create_quiz_attempt, evaluate_quiz, evaluate_single, generate_questions, list_questions,
    user_attempts, user_statistics,
};
use quizsmith_backend::protocol::{QuestionBatchRequest, QuizEvaluationRequest, UserAnswer};
use quizsmith_backend::state::AppState;
use quizsmith_backend::store::{NewQuizAttempt, QuestionFilter};
use uuid::Uuid;

use support::{state_with, FailingGenerator, ScriptedGenerator, FIVE_MCQ_WITH_TWO_BAD, TWO_SUBJECTIVE, WRAPPED_MCQ};

fn batch(question_type: QuestionType) -> QuestionBatchRequest {
    QuestionBatchRequest {
        topic: "general knowledge".into(),
        difficulty: Difficulty::Beginner,
        skill_type: SkillType::Technical,
        managerial_level: None,
        num_questions: 5,
        question_type,
    }
}

fn answer(question_id: Uuid, text: &str) -> UserAnswer {
    UserAnswer { question_id, user_answer: text.into(), user_id: Some("u-1".into()) }
}

#[tokio::test]
async fn recovers_after_two_failed_attempts() {
    let generator = Arc::new(ScriptedGenerator::new(vec![
        Err(GenerationError::Timeout),
        Ok("I'm sorry, I cannot produce that right now.".into()),
        Ok(FIVE_MCQ_WITH_TWO_BAD.into()),
    ]));
    let state = state_with(Some(generator.clone()));

    let created = generate_questions(&state, &batch(QuestionType::Mcq)).await.unwrap();
    assert_eq!(created.len(), 3);
    assert_eq!(generator.calls(), 3);

    let prompts = generator.prompts();
    assert!(!prompts[0].contains("IMPORTANT: Return ONLY valid JSON"));
    assert!(prompts[1].ends_with("IMPORTANT: Return ONLY valid JSON. Attempt 2."));
    assert!(prompts[2].ends_with("No explanations, no markdown, just clean JSON array."));

    let texts: Vec<&str> = created.iter().map(|q| q.question.text()).collect();
    assert_eq!(
        texts,
        vec!["What is 2+2 in base ten?", "What is the capital of France?", "Which language has a borrow checker?"]
    );
}

#[tokio::test]
async fn exhausted_budget_reports_generation_failure() {
    let generator = Arc::new(ScriptedGenerator::ok(&["definitely not json"]));
    let state = state_with(Some(generator.clone()));

    let err = generate_questions(&state, &batch(QuestionType::Mcq)).await.unwrap_err();
    match err {
        IngestError::Generation(failure) => {
            assert_eq!(failure.attempts, 3);
            assert!(failure.last_reason.contains("repair failed"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(generator.calls(), 3);
}

#[tokio::test]
async fn all_rejected_candidates_is_an_error() {
    let reply = r#"[{"question":"Too short?","options":["a","b"],"answer":"a"},{"question":""}]"#;
    let state = state_with(Some(Arc::new(ScriptedGenerator::ok(&[reply]))));

    let err = generate_questions(&state, &batch(QuestionType::Mcq)).await.unwrap_err();
    assert!(matches!(
        err,
        IngestError::NoValidCandidates { question_type: QuestionType::Mcq, rejected: 2 }
    ));
}

#[tokio::test]
async fn generation_requires_a_generator() {
    let state = state_with(None);
    let err = generate_questions(&state, &batch(QuestionType::Subjective)).await.unwrap_err();
    assert!(matches!(err, IngestError::GeneratorUnavailable));
}

#[tokio::test]
async fn repeated_batch_skips_stored_questions_and_lists_them_to_avoid() {
    let generator = Arc::new(ScriptedGenerator::ok(&[FIVE_MCQ_WITH_TWO_BAD]));
    let state = state_with(Some(generator.clone()));

    assert_eq!(generate_questions(&state, &batch(QuestionType::Mcq)).await.unwrap().len(), 3);
    let second = generate_questions(&state, &batch(QuestionType::Mcq)).await.unwrap();
    assert!(second.is_empty());

    let prompts = generator.prompts();
    let follow_up = &prompts[1];
    assert!(follow_up.contains("AVOID these existing questions"));
    assert!(follow_up.contains("1. Which language has a borrow checker?"));
    assert!(follow_up.contains("3. What is 2+2 in base ten?"));
}

#[tokio::test]
async fn quiz_run_isolates_unknown_questions_and_falls_back_to_keywords() {
    let ingest = state_with(Some(Arc::new(ScriptedGenerator::ok(&[TWO_SUBJECTIVE]))));
    let created = generate_questions(&ingest, &batch(QuestionType::Subjective)).await.unwrap();
    assert_eq!(created.len(), 2);

    // Same store, but scoring calls now fail.
    let state = AppState::new(ingest.config.clone(), ingest.store.clone(), Some(Arc::new(FailingGenerator)));
    let req = QuizEvaluationRequest {
        answers: vec![answer(created[0].id, "Mitochondria powerhouse"), answer(Uuid::new_v4(), "whatever")],
        quiz_attempt_id: Some("attempt-7".into()),
    };

    let out = evaluate_quiz(&state, &req).await.unwrap();
    assert_eq!(out.total_questions, 1);
    assert_eq!(out.skipped, 1);
    let only = &out.evaluations[0];
    assert_eq!(only.evaluation_method, EvaluationMethod::KeywordFallback);
    assert!((only.score - 2.0 / 6.0).abs() < 1e-9);
    assert!(!only.is_correct);
    assert!((out.percentage_score - only.score * 100.0).abs() < 1e-9);

    let stored = attempt_evaluations(&state, "attempt-7").await.unwrap();
    assert_eq!(stored, out.evaluations);
    assert!(attempt_evaluations(&state, "attempt-8").await.unwrap().is_empty());
}

#[tokio::test]
async fn quiz_run_scores_mcq_locally() {
    let generator = Arc::new(ScriptedGenerator::ok(&[FIVE_MCQ_WITH_TWO_BAD]));
    let state = state_with(Some(generator.clone()));
    let created = generate_questions(&state, &batch(QuestionType::Mcq)).await.unwrap();

    let req = QuizEvaluationRequest {
        answers: vec![answer(created[0].id, " 4 "), answer(created[1].id, "Rome")],
        quiz_attempt_id: None,
    };
    let out = evaluate_quiz(&state, &req).await.unwrap();
    assert_eq!(out.total_questions, 2);
    assert_eq!(out.total_score, 1.0);
    assert_eq!(out.percentage_score, 50.0);
    assert!(out.evaluations[0].is_correct);
    assert_eq!(out.evaluations[1].feedback, "Incorrect. The correct answer is: Paris");
    // MCQ scoring never touches the generator.
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn quiz_run_failures() {
    let state = state_with(None);
    let empty = QuizEvaluationRequest { answers: vec![], quiz_attempt_id: None };
    assert_eq!(evaluate_quiz(&state, &empty).await.unwrap_err(), EvaluationRunError::NoAnswers);

    let unknown = QuizEvaluationRequest {
        answers: vec![answer(Uuid::new_v4(), "a"), answer(Uuid::new_v4(), "b")],
        quiz_attempt_id: None,
    };
    assert_eq!(
        evaluate_quiz(&state, &unknown).await.unwrap_err(),
        EvaluationRunError::NoEvaluations { skipped: 2 }
    );
}

#[tokio::test]
async fn generation_scored_answers_are_repaired_and_clamped() {
    let question = ValidatedQuestion::Subjective(
        SubjectiveQuestion::try_new("Describe ownership in Rust.", "each value has a single owner").unwrap(),
    );
    let generator = ScriptedGenerator::ok(&["```json\n{\"score\": 1.7, \"feedback\": \"Spot on\",}\n```"]);

    let out = evaluate(Some(&generator as &dyn Generator), &Prompts::default(), &question, "every value has one owner").await;
    assert_eq!(out.method, EvaluationMethod::GenerationScored);
    assert_eq!(out.score, 1.0);
    assert_eq!(out.feedback, "Spot on");

    let prompt = &generator.prompts()[0];
    assert!(prompt.contains("Question: Describe ownership in Rust."));
    assert!(prompt.contains("Correct Answer: each value has a single owner"));
    assert!(prompt.contains("User's Answer: every value has one owner"));
}

#[tokio::test]
async fn unparseable_judgment_falls_back_to_keywords() {
    let question = ValidatedQuestion::Subjective(
        SubjectiveQuestion::try_new("Describe ownership in Rust.", "each value has a single owner").unwrap(),
    );
    let generator = ScriptedGenerator::ok(&["The answer is quite good, I'd say 8/10."]);

    let out = evaluate(Some(&generator as &dyn Generator), &Prompts::default(), &question, "each value has an owner").await;
    assert_eq!(out.method, EvaluationMethod::KeywordFallback);
    // {each, value, has, a, single, owner}: "each", "value", "has" and "owner" overlap.
    assert!((out.score - 4.0 / 6.0).abs() < 1e-9);
}

#[tokio::test]
async fn single_evaluation_does_not_persist() {
    let ingest = state_with(Some(Arc::new(ScriptedGenerator::ok(&[TWO_SUBJECTIVE]))));
    let created = generate_questions(&ingest, &batch(QuestionType::Subjective)).await.unwrap();
    let state = AppState::new(ingest.config.clone(), ingest.store.clone(), None);

    let out = evaluate_single(&state, created[1].id, "each value has a single owner").await.unwrap();
    assert_eq!(out.score, 1.0);
    assert_eq!(out.method, EvaluationMethod::KeywordFallback);

    assert!(evaluate_single(&state, Uuid::new_v4(), "x").await.is_err());
}

#[tokio::test]
async fn questions_wrapped_in_an_object_are_ingested() {
    let generator = Arc::new(ScriptedGenerator::ok(&[WRAPPED_MCQ]));
    let state = state_with(Some(generator.clone()));

    let created = generate_questions(&state, &batch(QuestionType::Mcq)).await.unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(created[1].question.expected_answer(), "Oslo");
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn quiz_run_opens_and_closes_an_attempt_for_the_user() {
    let state = state_with(Some(Arc::new(ScriptedGenerator::ok(&[FIVE_MCQ_WITH_TWO_BAD]))));
    let created = generate_questions(&state, &batch(QuestionType::Mcq)).await.unwrap();

    let req = QuizEvaluationRequest {
        answers: vec![answer(created[0].id, "4"), answer(created[1].id, "Paris"), answer(created[2].id, "Go")],
        quiz_attempt_id: None,
    };
    let out = evaluate_quiz(&state, &req).await.unwrap();
    let attempt_id = out.quiz_attempt_id.clone().expect("attempt opened for u-1");

    let attempts = user_attempts(&state, "u-1").await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].id, attempt_id);
    assert_eq!(attempts[0].num_questions, Some(3));
    assert_eq!(attempts[0].score, Some(2.0));
    assert!(attempts[0].ended_at.is_some());

    assert_eq!(attempt_evaluations(&state, &attempt_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn anonymous_quiz_run_has_no_attempt() {
    let state = state_with(Some(Arc::new(ScriptedGenerator::ok(&[FIVE_MCQ_WITH_TWO_BAD]))));
    let created = generate_questions(&state, &batch(QuestionType::Mcq)).await.unwrap();

    let anonymous = UserAnswer { question_id: created[0].id, user_answer: "4".into(), user_id: None };
    let out = evaluate_quiz(&state, &QuizEvaluationRequest { answers: vec![anonymous], quiz_attempt_id: None })
        .await
        .unwrap();
    assert!(out.quiz_attempt_id.is_none());
}

#[tokio::test]
async fn supplied_attempt_is_stamped_with_the_final_score() {
    let state = state_with(Some(Arc::new(ScriptedGenerator::ok(&[FIVE_MCQ_WITH_TWO_BAD]))));
    let created = generate_questions(&state, &batch(QuestionType::Mcq)).await.unwrap();
    let attempt = create_quiz_attempt(
        &state,
        NewQuizAttempt { user_id: "u-1".into(), topic: Some("general knowledge".into()), ..Default::default() },
    )
    .await
    .unwrap();

    let req = QuizEvaluationRequest {
        answers: vec![answer(created[0].id, "4")],
        quiz_attempt_id: Some(attempt.id.clone()),
    };
    evaluate_quiz(&state, &req).await.unwrap();

    let attempts = user_attempts(&state, "u-1").await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].score, Some(1.0));
    assert_eq!(attempts[0].topic.as_deref(), Some("general knowledge"));
}

#[tokio::test]
async fn user_statistics_cover_both_question_types() {
    let mcq_state = state_with(Some(Arc::new(ScriptedGenerator::ok(&[FIVE_MCQ_WITH_TWO_BAD]))));
    let mcq = generate_questions(&mcq_state, &batch(QuestionType::Mcq)).await.unwrap();
    let subjective_source = state_with(Some(Arc::new(ScriptedGenerator::ok(&[TWO_SUBJECTIVE]))));
    let subjective = generate_questions(&subjective_source, &batch(QuestionType::Subjective)).await.unwrap();
    for q in subjective {
        mcq_state.store.insert_question(q.question, q.meta).await.unwrap();
    }
    let subjective_id = list_questions(
        &mcq_state,
        &QuestionFilter { question_type: Some(QuestionType::Subjective), ..Default::default() },
        1,
    )
    .await
    .unwrap()[0]
        .id;

    // No generator: the subjective answer is keyword-scored.
    let state = AppState::new(mcq_state.config.clone(), mcq_state.store.clone(), None);
    let req = QuizEvaluationRequest {
        answers: vec![
            answer(mcq[0].id, "4"),
            answer(mcq[1].id, "Rome"),
            answer(subjective_id, "each value has a single owner"),
        ],
        quiz_attempt_id: None,
    };
    evaluate_quiz(&state, &req).await.unwrap();

    let stats = user_statistics(&state, "u-1").await.unwrap().unwrap();
    assert_eq!(stats.total_questions_attempted, 3);
    assert_eq!((stats.mcq_questions, stats.mcq_correct), (2, 1));
    assert_eq!(stats.mcq_accuracy, 50.0);
    assert_eq!(stats.subjective_questions, 1);
    assert_eq!(stats.subjective_average_score, 1.0);
    assert_eq!(stats.overall_percentage, 66.7);

    assert!(user_statistics(&state, "nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn stored_questions_are_listed_by_predicate() {
    let state = state_with(Some(Arc::new(ScriptedGenerator::ok(&[FIVE_MCQ_WITH_TWO_BAD]))));
    generate_questions(&state, &batch(QuestionType::Mcq)).await.unwrap();

    let all = list_questions(&state, &QuestionFilter::default(), 100).await.unwrap();
    assert_eq!(all[0].question.text(), "Which language has a borrow checker?");
    assert_eq!(all.len(), 3);

    let other_topic = QuestionFilter { topic: Some("history".into()), ..Default::default() };
    assert!(list_questions(&state, &other_topic, 100).await.unwrap().is_empty());

    let beginner_mcq = QuestionFilter {
        difficulty: Some(Difficulty::Beginner),
        question_type: Some(QuestionType::Mcq),
        ..Default::default()
    };
    assert_eq!(list_questions(&state, &beginner_mcq, 2).await.unwrap().len(), 2);
}
