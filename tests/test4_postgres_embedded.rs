#![cfg(feature = "test-utils-postgres")]

use sproc_middleware::prelude::*;
use sproc_middleware::test_utils::{setup_postgres_embedded, stop_postgres_embedded};
use tokio_postgres::NoTls;

const DDL: &str = r"
CREATE PROCEDURE save_item(
    p_id integer,
    p_name varchar,
    INOUT o_len integer,
    INOUT o_code boolean,
    INOUT o_msg varchar)
LANGUAGE plpgsql AS $$
BEGIN
    IF p_id < 0 THEN
        o_code := true;
        o_msg := 'duplicate key';
        RETURN;
    END IF;
    o_len := p_id + length(p_name);
    o_code := false;
    o_msg := 'ok';
END
$$;

CREATE PROCEDURE touch(INOUT o_code boolean, INOUT o_msg varchar)
LANGUAGE plpgsql AS $$
BEGIN
    o_code := false;
END
$$;
";

#[test]
fn test4_postgres_procedures_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let pg = setup_postgres_embedded("sproc_test")?;
    let cfg = pg.config.clone();

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(async move {
        let pool = cfg.create_pool(Some(deadpool_postgres::Runtime::Tokio1), NoTls)?;
        pool.get().await?.batch_execute(DDL).await?;

        let caller = Caller::postgres_pool(pool, CallerConfig::default());

        let len = caller
            .call_with_params_for_output(
                "save_item",
                &params![40_i64 => SqlType::Integer, "ab" => SqlType::Varchar],
                &param_types(&[SqlType::Integer]),
                |out: &OutputParams| out.get_int(1),
            )
            .await?;
        assert_eq!(len, 42);

        // Without the declared output the argument list does not match any procedure.
        let err = caller
            .call_with_params(
                "save_item",
                &params![1_i64 => SqlType::Integer, "x" => SqlType::Varchar],
            )
            .await;
        assert!(matches!(err, Err(SprocError::PostgresError(_))));

        let err = caller
            .call_with_params_for_output(
                "save_item",
                &params![-1_i64 => SqlType::Integer, "x" => SqlType::Varchar],
                &param_types(&[SqlType::Integer]),
                |out: &OutputParams| out.get(1).map(RowValues::is_null),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some((1, "duplicate key")));

        // NULL message reads as empty; a false code is success.
        caller.call("touch").await?;

        Ok::<_, Box<dyn std::error::Error>>(())
    });

    stop_postgres_embedded(pg);
    outcome
}
