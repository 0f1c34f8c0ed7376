#![cfg(feature = "test-utils")]

use std::sync::Arc;

use sproc_middleware::prelude::*;
use sproc_middleware::test_utils::{CallStats, FailAt, Script, ScriptedSource, result_set};

fn rows() -> ResultSet {
    result_set(
        &["id"],
        vec![
            vec![RowValues::Int(1)],
            vec![RowValues::Int(2)],
            vec![RowValues::Int(3)],
        ],
    )
}

fn caller_for(script: Script) -> (Caller, Arc<CallStats>) {
    let source = ScriptedSource::new(script);
    let stats = source.stats();
    (Caller::new(source, CallerConfig::default()), stats)
}

fn list_ids(
    rt: &tokio::runtime::Runtime,
    caller: &Caller,
) -> Result<Vec<i64>, SprocError> {
    rt.block_on(caller.call_for_list("list_ids", |row: &CustomDbRow| row.get_int("id")))
}

fn assert_released_once(stats: &CallStats, cursor_opened: bool) {
    assert_eq!(stats.acquired(), 1);
    assert_eq!(stats.connections_released(), 1);
    assert_eq!(stats.statements_released(), 1);
    let cursors = usize::from(cursor_opened);
    assert_eq!(stats.cursors_opened(), cursors);
    assert_eq!(stats.cursors_released(), cursors);
}

#[test]
fn test3_released_once_on_success() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    let (caller, stats) = caller_for(Script::new().with_rows(rows()));

    assert_eq!(list_ids(&rt, &caller)?, vec![1, 2, 3]);
    assert_released_once(&stats, true);
    assert_eq!(stats.executions(), 1);
    Ok(())
}

#[test]
fn test3_released_once_on_status_failure() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    let (caller, stats) = caller_for(Script::new().with_rows(rows()).with_status(1, "nope"));

    let err = list_ids(&rt, &caller).unwrap_err();
    assert!(err.is_status());
    assert_released_once(&stats, true);
    Ok(())
}

#[test]
fn test3_released_once_on_driver_failure() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;

    let (caller, stats) = caller_for(Script::new().with_rows(rows()).failing_at(FailAt::Execute));
    let err = list_ids(&rt, &caller).unwrap_err();
    assert!(matches!(err, SprocError::ExecutionError(_)));
    assert_released_once(&stats, false);
    assert_eq!(stats.executions(), 1);

    let (caller, stats) = caller_for(Script::new().with_rows(rows()).failing_at(FailAt::Row(1)));
    let err = list_ids(&rt, &caller).unwrap_err();
    assert!(!err.is_status());
    assert_released_once(&stats, true);
    assert_eq!(stats.rows_read(), 1);

    let (caller, stats) = caller_for(Script::new().failing_at(FailAt::Bind));
    assert!(rt.block_on(caller.call_with_params("p", &params![1_i64 => SqlType::Integer])).is_err());
    assert_released_once(&stats, false);
    assert_eq!(stats.executions(), 0);
    Ok(())
}

#[test]
fn test3_failed_prepare_still_releases_connection() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    let (caller, stats) = caller_for(Script::new().failing_at(FailAt::Prepare));

    assert!(rt.block_on(caller.call("p")).is_err());
    assert_eq!(stats.acquired(), 1);
    assert_eq!(stats.connections_released(), 1);
    assert_eq!(stats.statements_released(), 0);
    assert_eq!(stats.executions(), 0);
    Ok(())
}

#[test]
fn test3_failed_acquire_touches_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    let (caller, stats) = caller_for(Script::new().failing_at(FailAt::Acquire));

    assert!(rt.block_on(caller.call("p")).is_err());
    assert_eq!(stats.acquired(), 0);
    assert_eq!(stats.connections_released(), 0);
    Ok(())
}

#[test]
fn test3_mapper_error_releases_everything() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    let (caller, stats) = caller_for(Script::new().with_rows(rows()));

    let err = rt
        .block_on(caller.call_for_list("list_ids", |row: &CustomDbRow| {
            row.get_text("id").map(str::to_owned)
        }))
        .unwrap_err();
    assert!(matches!(err, SprocError::MappingError(_)));
    assert_released_once(&stats, true);
    Ok(())
}

#[test]
fn test3_each_call_acquires_its_own_connection() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    let (caller, stats) = caller_for(Script::new().with_rows(rows()));

    let shared = caller.clone();
    rt.block_on(async {
        let (a, b) = tokio::join!(
            caller.call_for_list("list_ids", |row: &CustomDbRow| row.get_int("id")),
            shared.call_for_list("list_ids", |row: &CustomDbRow| row.get_int("id")),
        );
        assert_eq!(a?.len(), 3);
        assert_eq!(b?.len(), 3);
        Ok::<_, SprocError>(())
    })?;

    assert_eq!(stats.acquired(), 2);
    assert_eq!(stats.connections_released(), 2);
    assert_eq!(stats.statements_released(), 2);
    assert_eq!(stats.cursors_released(), 2);
    Ok(())
}
