//! Property-based tests for the transaction state machine and quoting
//!
//! These tests verify contract-level properties across arbitrary inputs:
//! - `in_transaction()` tracks the Autocommit/InTransaction machine for
//!   every sequence of operations, on the real driver and on the double
//! - failed transitions never mutate state
//! - quoted literals store exactly what a bound parameter would

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use sqlbridge::core::driver::{Connection, ParamType, QueryPlan, StatementOptions, Value};
    use sqlbridge::sqlite::SqliteConnection;
    use sqlbridge::test_utils::StubConnection;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Op {
        Begin,
        Commit,
        Rollback,
        Exec,
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Begin),
            Just(Op::Commit),
            Just(Op::Rollback),
            Just(Op::Exec),
        ]
    }

    fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
        prop::collection::vec(arb_op(), 0..32)
    }

    /// Applies one operation and returns whether it succeeded.
    fn apply(conn: &mut dyn Connection, op: Op) -> bool {
        match op {
            Op::Begin => conn.begin_transaction().is_ok(),
            Op::Commit => conn.commit().is_ok(),
            Op::Rollback => conn.roll_back().is_ok(),
            Op::Exec => conn.exec("SELECT 1").is_ok(),
        }
    }

    /// Reference model: the transaction state machine is one boolean.
    fn model_step(active: &mut bool, op: Op) -> bool {
        match op {
            Op::Begin => {
                if *active {
                    false
                } else {
                    *active = true;
                    true
                }
            }
            Op::Commit | Op::Rollback => {
                if *active {
                    *active = false;
                    true
                } else {
                    false
                }
            }
            Op::Exec => true,
        }
    }

    proptest! {
        /// The SQLite driver follows the state machine for every
        /// operation sequence, and failures leave the state unchanged.
        #[test]
        fn prop_sqlite_tracks_state_machine(ops in arb_ops()) {
            let mut conn = SqliteConnection::open(":memory:").unwrap();
            let mut active = false;

            for op in ops {
                let before = conn.in_transaction();
                let succeeded = apply(&mut conn, op);
                let expected = model_step(&mut active, op);

                prop_assert_eq!(succeeded, expected,
                    "operation {:?} disagreed with the model", op);
                prop_assert_eq!(conn.in_transaction(), active,
                    "state diverged after {:?}", op);
                if !succeeded {
                    prop_assert_eq!(conn.in_transaction(), before,
                        "failed {:?} mutated state", op);
                }
            }
        }

        /// The scripted double and the real driver accept and reject the
        /// same operation sequences.
        #[test]
        fn prop_stub_agrees_with_sqlite(ops in arb_ops()) {
            let mut sqlite = SqliteConnection::open(":memory:").unwrap();
            let mut stub = StubConnection::new();

            for op in ops {
                let on_sqlite = apply(&mut sqlite, op);
                let on_stub = apply(&mut stub, op);
                prop_assert_eq!(on_sqlite, on_stub,
                    "drivers disagreed on {:?}", op);
                prop_assert_eq!(sqlite.in_transaction(), stub.in_transaction());
            }
        }

        /// Failed transitions always leave a diagnostic behind and
        /// successful ones always clear it.
        #[test]
        fn prop_diagnostics_reflect_last_operation(ops in arb_ops()) {
            let mut conn = SqliteConnection::open(":memory:").unwrap();

            for op in ops {
                let succeeded = apply(&mut conn, op);
                if succeeded {
                    prop_assert_eq!(conn.error_code(), None);
                    prop_assert!(conn.error_info().is_clear());
                } else {
                    prop_assert!(conn.error_code().is_some());
                    prop_assert!(!conn.error_info().is_clear());
                }
            }
        }

        /// Interpolating a quoted text literal stores the same value a
        /// bound parameter would.
        #[test]
        fn prop_quote_round_trips(text in "[^\\x00]{0,60}") {
            let mut conn = SqliteConnection::open(":memory:").unwrap();
            conn.exec("CREATE TABLE q (x TEXT)").unwrap();

            let original = Value::Text(text);
            let literal = conn.quote(&original, ParamType::Str).unwrap();
            conn.exec(&format!("INSERT INTO q (x) VALUES ({})", literal)).unwrap();
            {
                let mut stmt = conn
                    .prepare("INSERT INTO q (x) VALUES (?)", StatementOptions::default())
                    .unwrap();
                stmt.execute(std::slice::from_ref(&original)).unwrap();
            }

            let mut stmt = conn
                .query("SELECT x FROM q", QueryPlan::Column { index: 0 })
                .unwrap();
            let cells = stmt.fetch_all().unwrap();
            prop_assert_eq!(cells.len(), 2);
            prop_assert_eq!(cells[0].as_cell(), Some(&original));
            prop_assert_eq!(&cells[0], &cells[1]);
        }

        /// Integer quoting is hint-sensitive but always round-trips.
        #[test]
        fn prop_integer_quote_round_trips(value in any::<i64>()) {
            let mut conn = SqliteConnection::open(":memory:").unwrap();
            conn.exec("CREATE TABLE q (x INTEGER)").unwrap();

            let original = Value::Integer(value);
            let literal = conn.quote(&original, ParamType::Int).unwrap();
            conn.exec(&format!("INSERT INTO q (x) VALUES ({})", literal)).unwrap();

            let mut stmt = conn
                .query("SELECT x FROM q", QueryPlan::Column { index: 0 })
                .unwrap();
            let cells = stmt.fetch_all().unwrap();
            prop_assert_eq!(cells[0].as_cell(), Some(&original));
        }
    }
}
