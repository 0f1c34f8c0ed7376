#![cfg(feature = "test-utils")]

use sproc_middleware::prelude::*;
use sproc_middleware::test_utils::{RecordedBinding, Script, ScriptedSource, result_set};

fn user_rows() -> ResultSet {
    result_set(
        &["id", "name"],
        vec![
            vec![RowValues::Int(1), RowValues::Text("alice".into())],
            vec![RowValues::Int(2), RowValues::Text("bob".into())],
            vec![RowValues::Int(3), RowValues::Text("carol".into())],
        ],
    )
}

#[test]
fn test1_two_inputs_map_every_row_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let source = ScriptedSource::new(Script::new().with_rows(user_rows()));
    let stats = source.stats();
    let caller = Caller::new(source, CallerConfig::default());

    let rt = tokio::runtime::Runtime::new()?;
    let names = rt.block_on(async {
        let mut calls = 0;
        let names = caller
            .call_with_params_for_list(
                "list_users",
                &params![42_i64 => SqlType::Integer, "x" => SqlType::Varchar],
                |row: &CustomDbRow| -> Result<String, SprocError> {
                    calls += 1;
                    Ok(format!("{}:{}", row.get_int("id")?, row.get_text("name")?))
                },
            )
            .await?;
        assert_eq!(calls, 3);
        Ok::<_, SprocError>(names)
    })?;

    assert_eq!(names, vec!["1:alice", "2:bob", "3:carol"]);
    assert_eq!(stats.statements(), vec!["{call list_users(?,?,?,?)}".to_string()]);
    assert_eq!(stats.executions(), 1);
    assert_eq!(stats.rows_read(), 3);
    Ok(())
}

#[test]
fn test1_bindings_follow_positional_layout() -> Result<(), Box<dyn std::error::Error>> {
    let source = ScriptedSource::new(
        Script::new().with_outputs(vec![RowValues::Int(7), RowValues::Text("ok".into())]),
    );
    let stats = source.stats();
    let caller = Caller::new(source, CallerConfig::default());

    let rt = tokio::runtime::Runtime::new()?;
    let (id, note) = rt.block_on(caller.call_with_params_for_output(
        "save_item",
        &params![10_i64 => SqlType::BigInt, "widget" => SqlType::NVarchar],
        &param_types(&[SqlType::Integer, SqlType::Varchar]),
        |out: &OutputParams| -> Result<(i64, Option<String>), SprocError> {
            Ok((out.get_int(1)?, out.get_text(2)?.map(str::to_owned)))
        },
    ))?;
    assert_eq!(id, 7);
    assert_eq!(note.as_deref(), Some("ok"));

    assert_eq!(
        stats.bindings(),
        vec![
            RecordedBinding::Input {
                index: 1,
                value: RowValues::Int(10),
                sql_type: SqlType::BigInt,
            },
            RecordedBinding::Input {
                index: 2,
                value: RowValues::Text("widget".into()),
                sql_type: SqlType::NVarchar,
            },
            RecordedBinding::Output {
                index: 3,
                sql_type: SqlType::Integer,
            },
            RecordedBinding::Output {
                index: 4,
                sql_type: SqlType::Varchar,
            },
            RecordedBinding::Output {
                index: 5,
                sql_type: SqlType::Boolean,
            },
            RecordedBinding::Output {
                index: 6,
                sql_type: SqlType::Varchar,
            },
        ]
    );
    Ok(())
}

#[test]
fn test1_placeholder_count_matches_layout() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    for status_fields in [true, false] {
        let source = ScriptedSource::new(Script::new());
        let stats = source.stats();
        let caller = Caller::new(
            source,
            CallerConfig::default().with_status_fields(status_fields),
        );
        rt.block_on(caller.call_full(
            "p",
            &params![1_i64 => SqlType::Integer],
            &param_types(&[SqlType::Integer, SqlType::Integer, SqlType::Integer]),
            |_: &OutputParams| Ok::<_, SprocError>(()),
            |_: &CustomDbRow| Ok::<_, SprocError>(()),
        ))?;
        let expected = 1 + 3 + if status_fields { 2 } else { 0 };
        let sql = &stats.statements()[0];
        assert_eq!(sql.matches('?').count(), expected);
        assert_eq!(stats.bindings().len(), expected);
    }
    Ok(())
}

#[test]
fn test1_no_row_mapper_never_reads_rows() -> Result<(), Box<dyn std::error::Error>> {
    let source = ScriptedSource::new(Script::new().with_rows(user_rows()));
    let stats = source.stats();
    let caller = Caller::new(source, CallerConfig::default());

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(caller.call_with_params(
        "list_users",
        &params![42_i64 => SqlType::Integer],
    ))?;
    let out: i64 = rt.block_on(caller.call_for_output(
        "list_users",
        &param_types(&[SqlType::Integer]),
        |out: &OutputParams| Ok::<_, SprocError>(out.len() as i64),
    ))?;
    assert_eq!(out, 1);

    assert_eq!(stats.cursors_opened(), 0);
    assert_eq!(stats.rows_read(), 0);
    assert_eq!(stats.executions(), 2);
    Ok(())
}

#[test]
fn test1_output_mapper_runs_once() -> Result<(), Box<dyn std::error::Error>> {
    let source = ScriptedSource::new(Script::new().with_outputs(vec![
        RowValues::Int(1),
        RowValues::Int(2),
        RowValues::Int(3),
    ]));
    let caller = Caller::new(source, CallerConfig::default());

    let rt = tokio::runtime::Runtime::new()?;
    let mut invocations = 0;
    let sum = rt.block_on(caller.call_for_output(
        "totals",
        &param_types(&[SqlType::Integer, SqlType::Integer, SqlType::Integer]),
        |out: &OutputParams| {
            invocations += 1;
            out.iter()
                .map(|v| v.as_int().copied().ok_or_else(|| SprocError::MappingError("int".into())))
                .sum::<Result<i64, SprocError>>()
        },
    ))?;
    assert_eq!(sum, 6);
    assert_eq!(invocations, 1);
    Ok(())
}

#[test]
fn test1_call_full_returns_both_parts() -> Result<(), Box<dyn std::error::Error>> {
    let source = ScriptedSource::new(
        Script::new()
            .with_rows(user_rows())
            .with_outputs(vec![RowValues::Int(3)]),
    );
    let caller = Caller::new(source, CallerConfig::default());

    let rt = tokio::runtime::Runtime::new()?;
    let tuple = rt.block_on(caller.call_full(
        "search_users",
        &params!["a" => SqlType::Varchar],
        &param_types(&[SqlType::BigInt]),
        |out: &OutputParams| out.get_int(1),
        |row: &CustomDbRow| row.get_int("id"),
    ))?;
    assert_eq!(tuple.list(), Some(&[1, 2, 3][..]));
    assert_eq!(tuple.object(), Some(&3));

    let (rows, total) = rt
        .block_on(
            caller
                .procedure("search_users")
                .param(Param::of("a", SqlType::Varchar))
                .outputs(param_types(&[SqlType::BigInt]), |out: &OutputParams| {
                    out.get_int(1)
                })
                .map_rows(|row: &CustomDbRow| -> Result<String, SprocError> {
                    Ok(row.get_text("name")?.to_string())
                })
                .execute(),
        )?
        .into_parts();
    assert_eq!(rows.map(|r| r.len()), Some(3));
    assert_eq!(total, Some(3));
    Ok(())
}

#[test]
fn test1_no_row_set_yields_empty_list() -> Result<(), Box<dyn std::error::Error>> {
    let caller = Caller::new(ScriptedSource::new(Script::new()), CallerConfig::default());
    let rt = tokio::runtime::Runtime::new()?;

    let list = rt.block_on(caller.call_for_list("nothing", |row: &CustomDbRow| row.get_int("id")))?;
    assert!(list.is_empty());

    let tuple = rt.block_on(caller.call_full(
        "nothing",
        &[],
        &[],
        |_: &OutputParams| Ok::<_, SprocError>(()),
        |row: &CustomDbRow| row.get_int("id"),
    ))?;
    assert!(tuple.list().is_none());

    rt.block_on(caller.call("nothing"))?;
    Ok(())
}

#[test]
fn test1_output_mapper_skipped_without_output_types() -> Result<(), Box<dyn std::error::Error>> {
    let source = ScriptedSource::new(Script::new().with_rows(user_rows()));
    let stats = source.stats();
    let caller = Caller::new(source, CallerConfig::default());
    let rt = tokio::runtime::Runtime::new()?;

    let mut invocations = 0;
    let tuple = rt.block_on(caller.call_full(
        "list_users",
        &[],
        &[],
        |out: &OutputParams| {
            invocations += 1;
            Ok::<_, SprocError>(out.len())
        },
        |row: &CustomDbRow| row.get_int("id"),
    ))?;
    assert_eq!(invocations, 0);
    assert!(tuple.object().is_none());
    assert_eq!(tuple.list().map(<[i64]>::len), Some(3));
    assert_eq!(stats.executions(), 1);

    // A typed-output call with nothing declared is refused before touching the database.
    let err = rt
        .block_on(caller.call_for_output("list_users", &[], |out: &OutputParams| {
            Ok::<_, SprocError>(out.len())
        }))
        .unwrap_err();
    assert!(matches!(err, SprocError::ParameterError(_)));
    assert_eq!(stats.acquired(), 1);
    assert_eq!(stats.executions(), 1);
    Ok(())
}
