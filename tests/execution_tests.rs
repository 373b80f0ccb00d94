//! Execution tests against an in-memory SQLite database.
//!
//! Run with `RUST_LOG=treeql=debug cargo test --test execution_tests -- --nocapture`
//! to see the compiled SQL.

use std::io;
use std::sync::{Arc, Mutex};

use futures::TryStreamExt;
use sqlx::{AnyConnection, Connection};
use tracing_subscriber::EnvFilter;
use treeql::prelude::*;

const SCHEMA: &[&str] = &[
    "create table Users (Id INTEGER, Name TEXT, Age INTEGER, Email TEXT)",
    "insert into Users values (1, 'Ada', 36, 'ada@example.com')",
    "insert into Users values (2, 'Grace', 45, null)",
    "insert into Users values (3, 'Linus', 17, 'linus@example.com')",
    "insert into Users values (4, 'Ken', 70, null)",
    "create table Orders (Id INTEGER, UserId INTEGER, Total REAL)",
    "insert into Orders values (10, 1, 9.5)",
    "insert into Orders values (11, 1, 20.0)",
    "insert into Orders values (12, 2, 5.25)",
    "insert into Orders values (13, 3, 7.0)",
    "insert into Orders values (14, 1, 1.0)",
];

async fn connect() -> AnyConnection {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    sqlx::any::install_default_drivers();

    let mut conn = AnyConnection::connect("sqlite::memory:").await.unwrap();
    for statement in SCHEMA {
        sqlx::query(statement).execute(&mut conn).await.unwrap();
    }
    conn
}

fn users() -> SourceNode {
    SourceNode::table("Users", "Users", ["Id", "Name", "Age", "Email"]).unwrap()
}

fn orders() -> SourceNode {
    SourceNode::table("Orders", "Orders", ["Id", "UserId", "Total"]).unwrap()
}

fn executor() -> QueryExecutor {
    QueryExecutor::new(Dialect::Sqlite)
}

fn ints(records: &[Record], key: &str, name: &str) -> Vec<i64> {
    records
        .iter()
        .map(|record| match record[key][name] {
            Value::Int(n) => n,
            ref other => panic!("expected an integer for {}.{}, got {:?}", key, name, other),
        })
        .collect()
}

/// Users' ids, ascending.
fn user_ids(users: &SourceNode) -> SourceNode {
    users
        .select([users.field(0).unwrap()])
        .unwrap()
        .order_by(&users.field(0).unwrap(), Direction::Ascending)
        .unwrap()
}

#[tokio::test]
async fn test_table_scan() {
    let mut conn = connect().await;
    let records = executor().query(&mut conn, &users()).await.unwrap();

    assert_eq!(records.len(), 4);
    for record in &records {
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["Users"]);
        assert_eq!(record["Users"].len(), 4);
    }
    let mut names: Vec<String> = records
        .iter()
        .map(|r| r["Users"]["Name"].to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["'Ada'", "'Grace'", "'Ken'", "'Linus'"]);
}

#[tokio::test]
async fn test_null_materializes_as_value() {
    let mut conn = connect().await;
    let users = users();
    let grace = users
        .filter(PredicateNode::eq(users.field(0).unwrap(), 2))
        .unwrap();

    let record = executor()
        .fetch_optional(&mut conn, &executor().compile(&grace).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record["Users"].get("Email"), Some(&Value::Null));
    assert_eq!(record["Users"]["Name"], Value::Text("Grace".to_string()));
    assert_eq!(record["Users"]["Age"], Value::Int(45));
}

#[tokio::test]
async fn test_all_null_row() {
    let mut conn = connect().await;
    sqlx::query("create table Notes (Id INTEGER, Body TEXT, Score REAL)")
        .execute(&mut conn)
        .await
        .unwrap();
    sqlx::query("insert into Notes values (null, null, null)")
        .execute(&mut conn)
        .await
        .unwrap();

    let notes = SourceNode::table("Notes", "Notes", ["Id", "Body", "Score"]).unwrap();
    let records = executor().query(&mut conn, &notes).await.unwrap();

    assert_eq!(records.len(), 1);
    let item = &records[0]["Notes"];
    assert_eq!(item.len(), 3);
    assert!(item.iter().all(|(_, value)| *value == Value::Null));
}

#[tokio::test]
async fn test_pagination_boundaries() {
    let mut conn = connect().await;
    let users = users();
    let ids = user_ids(&users);
    let executor = executor();

    let none = executor.query(&mut conn, &ids.take(0).unwrap()).await.unwrap();
    assert!(none.is_empty());

    let beyond = executor.query(&mut conn, &ids.skip(10).unwrap()).await.unwrap();
    assert!(beyond.is_empty());

    let skip_take = executor
        .query(&mut conn, &ids.skip(1).unwrap().take(2).unwrap())
        .await
        .unwrap();
    assert_eq!(ints(&skip_take, "Users", "Id"), vec![2, 3]);

    let take_skip = executor
        .query(&mut conn, &ids.take(2).unwrap().skip(1).unwrap())
        .await
        .unwrap();
    assert_eq!(ints(&take_skip, "Users", "Id"), vec![2]);

    let skip_only = executor.query(&mut conn, &ids.skip(3).unwrap()).await.unwrap();
    assert_eq!(ints(&skip_only, "Users", "Id"), vec![4]);
}

#[tokio::test]
async fn test_ordering_descending_then_by() {
    let mut conn = connect().await;
    let users = users();
    let query = users
        .select([users.field(0).unwrap(), users.field(3).unwrap()])
        .unwrap()
        .order_by(&users.field(3).unwrap(), Direction::Ascending)
        .unwrap()
        .then_by(&users.field(0).unwrap(), Direction::Descending)
        .unwrap();

    let records = executor().query(&mut conn, &query).await.unwrap();
    // SQLite sorts nulls first.
    assert_eq!(ints(&records, "Users", "Id"), vec![4, 2, 1, 3]);
}

#[tokio::test]
async fn test_join_fan_out() {
    let mut conn = connect().await;
    let users = users();
    let orders = orders();
    let on = || {
        Some(PredicateNode::eq(
            users.field(0).unwrap(),
            orders.field(1).unwrap(),
        ))
    };
    let executor = executor();

    let both = users
        .join(&orders, JoinKind::Inner, on(), JoinProjection::Both)
        .unwrap();
    let records = executor.query(&mut conn, &both).await.unwrap();
    assert_eq!(records.len(), 5);
    for record in &records {
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["Orders", "Users"]);
        assert_eq!(record["Users"]["Id"], record["Orders"]["UserId"]);
    }

    let outer = users
        .join(&orders, JoinKind::Inner, on(), JoinProjection::Outer)
        .unwrap();
    let records = executor.query(&mut conn, &outer).await.unwrap();
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r.keys().collect::<Vec<_>>() == vec!["Users"]));

    let inner = users
        .join(&orders, JoinKind::Inner, on(), JoinProjection::Inner)
        .unwrap();
    let records = executor.query(&mut conn, &inner).await.unwrap();
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r.keys().collect::<Vec<_>>() == vec!["Orders"]));
}

#[tokio::test]
async fn test_join_one_by_many() {
    let mut conn = connect().await;
    let users = users();
    let orders = orders();
    let ada = users
        .filter(PredicateNode::eq(users.field(1).unwrap(), "Ada"))
        .unwrap();
    let joined = ada
        .join(
            &orders,
            JoinKind::Inner,
            Some(PredicateNode::eq(
                users.field(0).unwrap(),
                orders.field(1).unwrap(),
            )),
            JoinProjection::Fields(vec![users.field(1).unwrap(), orders.field(0).unwrap()]),
        )
        .unwrap();
    let order_id = joined.field(1).unwrap();
    let query = joined
        .select([joined.field(0).unwrap(), order_id.clone()])
        .unwrap()
        .order_by(&order_id, Direction::Ascending)
        .unwrap();

    let records = executor().query(&mut conn, &query).await.unwrap();
    assert_eq!(ints(&records, "Orders", "Id"), vec![10, 11, 14]);
    assert!(records
        .iter()
        .all(|r| r["Users"]["Name"] == Value::Text("Ada".to_string())));
}

#[tokio::test]
async fn test_filter_joined_with_its_own_source() {
    let mut conn = connect().await;
    let users = users();
    let adults = users
        .filter(PredicateNode::gte(users.field(2).unwrap(), 18))
        .unwrap();
    let joined = adults
        .join(
            &users,
            JoinKind::Inner,
            Some(PredicateNode::eq(
                adults.field(0).unwrap(),
                users.field(0).unwrap(),
            )),
            JoinProjection::Fields(vec![adults.field(0).unwrap(), users.field(1).unwrap()]),
        )
        .unwrap();
    let id = joined.field(0).unwrap();
    let query = joined
        .select([id.clone(), joined.field(1).unwrap()])
        .unwrap()
        .order_by(&id, Direction::Ascending)
        .unwrap();

    let records = executor().query(&mut conn, &query).await.unwrap();
    assert_eq!(ints(&records, "Users", "Id"), vec![1, 2, 4]);
    assert_eq!(records[0]["Users"]["Name"], Value::Text("Ada".to_string()));
}

#[tokio::test]
async fn test_left_join_keeps_unmatched_rows() {
    let mut conn = connect().await;
    let users = users();
    let orders = orders();
    let joined = users
        .join(
            &orders,
            JoinKind::Left,
            Some(PredicateNode::eq(
                users.field(0).unwrap(),
                orders.field(1).unwrap(),
            )),
            JoinProjection::Both,
        )
        .unwrap();

    let records = executor().query(&mut conn, &joined).await.unwrap();
    assert_eq!(records.len(), 6);

    let ken = records
        .iter()
        .find(|r| r["Users"]["Id"] == Value::Int(4))
        .unwrap();
    assert_eq!(ken["Orders"]["Id"], Value::Null);
    assert_eq!(ken["Orders"]["Total"], Value::Null);
}

#[tokio::test]
async fn test_filters_bind_parameters() {
    let mut conn = connect().await;
    let users = users();
    let executor = executor();

    let adults = users
        .filter(PredicateNode::and(
            PredicateNode::gte(users.field(2).unwrap(), 18),
            PredicateNode::neq(users.field(1).unwrap(), "Ken"),
        ))
        .unwrap();
    let compiled = executor.compile(&adults).unwrap();
    assert_eq!(compiled.parameters().len(), 2);
    let records = executor.fetch_all(&mut conn, &compiled).await.unwrap();
    let mut ids = ints(&records, "Users", "Id");
    ids.sort();
    assert_eq!(ids, vec![1, 2]);

    let without_email = users
        .filter(PredicateNode::eq(users.field(3).unwrap(), Expr::null()))
        .unwrap();
    let records = executor.query(&mut conn, &without_email).await.unwrap();
    let mut ids = ints(&records, "Users", "Id");
    ids.sort();
    assert_eq!(ids, vec![2, 4]);

    let named = users
        .filter(PredicateNode::contains(
            LiteralNode::array(["Ada", "Ken"]).unwrap(),
            users.field(1).unwrap(),
        ))
        .unwrap();
    let records = executor.query(&mut conn, &named).await.unwrap();
    let mut ids = ints(&records, "Users", "Id");
    ids.sort();
    assert_eq!(ids, vec![1, 4]);
}

#[tokio::test]
async fn test_contains_sub_select() {
    let mut conn = connect().await;
    let users = users();
    let orders = orders();
    let buyers = users
        .filter(PredicateNode::contains(
            ScalarNode::new(&orders, orders.field(1).unwrap()).unwrap(),
            users.field(0).unwrap(),
        ))
        .unwrap();

    let records = executor().query(&mut conn, &buyers).await.unwrap();
    let mut ids = ints(&records, "Users", "Id");
    ids.sort();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_aggregates() {
    let mut conn = connect().await;
    let users = users();
    let orders = orders();
    let executor = executor();

    let count = AggregateNode::new(&orders, &orders.field(0).unwrap(), AggregateFunction::Count)
        .unwrap()
        .to_select()
        .unwrap();
    let records = executor.query(&mut conn, &count).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["Orders"]["count(Id)"], Value::Int(5));

    let total = AggregateNode::new(&orders, &orders.field(2).unwrap(), AggregateFunction::Sum)
        .unwrap()
        .to_select()
        .unwrap();
    let records = executor.query(&mut conn, &total).await.unwrap();
    assert_eq!(records[0]["Orders"]["sum(Total)"], Value::Float(42.75));

    let oldest = AggregateNode::new(&users, &users.field(2).unwrap(), AggregateFunction::Max)
        .unwrap()
        .to_select()
        .unwrap();
    let records = executor.query(&mut conn, &oldest).await.unwrap();
    assert_eq!(records[0]["Users"]["max(Age)"], Value::Int(70));
}

#[tokio::test]
async fn test_scalar_projection() {
    let mut conn = connect().await;
    let users = users();
    let orders = orders();
    let order_count =
        AggregateNode::new(&orders, &orders.field(0).unwrap(), AggregateFunction::Count).unwrap();
    let query = users
        .select([
            FieldExpr::from(users.field(1).unwrap()),
            FieldExpr::from(ScalarNode::new(&orders, order_count).unwrap()),
        ])
        .unwrap();

    let records = executor().query(&mut conn, &query).await.unwrap();
    assert_eq!(records.len(), 4);
    for record in &records {
        assert_eq!(record["Orders"]["count(Id)"], Value::Int(5));
        assert!(record["Users"].get("Name").is_some());
    }
}

#[tokio::test]
async fn test_stream_is_lazy_and_droppable() {
    let mut conn = connect().await;
    let users = users();
    let ids = user_ids(&users);
    let executor = executor();
    let compiled = executor.compile(&ids).unwrap();

    {
        let mut stream = executor.fetch(&mut conn, &compiled);
        let first = stream.try_next().await.unwrap().unwrap();
        assert_eq!(first["Users"]["Id"], Value::Int(1));
    }

    // The connection is usable again once the stream is dropped.
    let records = executor.fetch_all(&mut conn, &compiled).await.unwrap();
    assert_eq!(ints(&records, "Users", "Id"), vec![1, 2, 3, 4]);

    let empty = executor.compile(&ids.take(0).unwrap()).unwrap();
    let none = executor.fetch_optional(&mut conn, &empty).await.unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn test_merge_records_from_separate_queries() {
    let mut conn = connect().await;
    let users = users();
    let orders = orders();
    let executor = executor();

    let user = executor
        .fetch_optional(&mut conn, &executor.compile(&user_ids(&users)).unwrap())
        .await
        .unwrap()
        .unwrap();
    let order = executor
        .fetch_optional(&mut conn, &executor.compile(&orders).unwrap())
        .await
        .unwrap()
        .unwrap();

    let merged = (user.clone() | order).unwrap();
    assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["Orders", "Users"]);

    let err = (merged | user).unwrap_err();
    assert!(matches!(err, TreeqlError::AmbiguousKey(_)));
}

#[tokio::test]
async fn test_execution_error() {
    let mut conn = connect().await;
    let missing = SourceNode::table("Missing", "Missing", ["Id"]).unwrap();

    let err = executor().query(&mut conn, &missing).await.unwrap_err();
    assert!(matches!(err, TreeqlError::Execution(_)));
}

#[tokio::test]
async fn test_database_from_settings() {
    let settings = Settings::from_toml_str(
        "[compiler]\ndialect = \"sqlite\"\n\n[database]\nurl = \"sqlite::memory:\"\n",
    )
    .unwrap();
    let db = settings.connect().await.unwrap();
    assert_eq!(db.executor().dialect(), Dialect::Sqlite);

    // A fresh in-memory database has no tables.
    let err = db.query(&users()).await.unwrap_err();
    assert!(matches!(err, TreeqlError::Execution(_)));
}

#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_stream_logs_row_count_when_exhausted() {
    let mut conn = connect().await;
    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let executor = executor();
    let compiled = executor.compile(&users()).unwrap();
    let records: Vec<Record> = executor
        .fetch(&mut conn, &compiled)
        .try_collect()
        .await
        .unwrap();
    assert_eq!(records.len(), 4);

    let output = log.contents();
    assert!(output.contains("executing query"));
    assert!(output.contains("query finished"));
    assert!(output.contains("rows=4"));
}
