use std::collections::BTreeSet;

use async_trait::async_trait;
use deadpool_postgres::{Pool, Transaction};
use library_api::model::{author::AuthorId, book::BookId};
use tokio_postgres::{Row, error::SqlState};
use tracing::debug;
use uuid::Uuid;

use crate::{
    book::repository::{
        BookRecordInsert, BookRecordOwned, BookRecordReplace, BookRepository, BookWriteResult,
    },
    error::AppResult,
};

/// `PostgreSQL` implementation of the book repository.
///
/// Writes run in a single transaction each. A transaction that is not
/// committed, including one whose request future was dropped, rolls back.
#[derive(Debug, Clone)]
pub struct PostgresBookRepository {
    pool: Pool,
}

const SELECT_BOOK: &str = "
    SELECT b.id, b.name, array_agg(ab.author_id ORDER BY ab.author_id) AS author_ids
    FROM book b
    JOIN author_book ab ON ab.book_id = b.id
    WHERE b.id = $1
    GROUP BY b.id, b.name";

const SELECT_AUTHOR_BOOKS: &str = "
    SELECT b.id, b.name, array_agg(co.author_id ORDER BY co.author_id) AS author_ids
    FROM author_book ab
    JOIN book b ON b.id = ab.book_id
    JOIN author_book co ON co.book_id = b.id
    WHERE ab.author_id = $1 AND ($2::uuid IS NULL OR b.id > $2)
    GROUP BY b.id, b.name
    ORDER BY b.id
    LIMIT $3";

const INSERT_ASSOCIATIONS: &str = "
    INSERT INTO author_book (author_id, book_id)
    SELECT unnest($1::uuid[]), $2
    ON CONFLICT DO NOTHING";

impl PostgresBookRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for PostgresBookRepository {
    async fn insert_with_authors(&self, record: BookRecordInsert) -> AppResult<BookWriteResult> {
        let author_ids = uuids(&record.author_ids);

        let mut client = self.pool.get().await?;
        let transaction = client.transaction().await?;

        if let Some(missing) = missing_authors(&transaction, &record.author_ids).await? {
            return Ok(missing);
        }

        transaction
            .execute(
                "INSERT INTO book (id, name) VALUES ($1, $2)",
                &[&record.id.0, &record.name],
            )
            .await?;
        let inserted = transaction
            .execute(INSERT_ASSOCIATIONS, &[&author_ids, &record.id.0])
            .await;
        if let Some(result) = foreign_key_violation(inserted, &record.author_ids)? {
            return Ok(result);
        }

        transaction.commit().await?;
        debug!(book_id = %record.id, authors = author_ids.len(), "inserted book");

        Ok(BookWriteResult::Written)
    }

    async fn select_with_authors(&self, id: &BookId) -> AppResult<Option<BookRecordOwned>> {
        let client = self.pool.get().await?;
        let row = client.query_opt(SELECT_BOOK, &[&id.0]).await?;
        Ok(row.as_ref().map(book_from_row))
    }

    async fn replace_authors(&self, replace: BookRecordReplace<'_>) -> AppResult<BookWriteResult> {
        let author_ids = uuids(replace.author_ids);

        let mut client = self.pool.get().await?;
        let transaction = client.transaction().await?;

        // Locks the book row, so concurrent replacements of one book serialize.
        let updated = transaction
            .execute(
                "UPDATE book SET name = $2, updated_at = now() WHERE id = $1",
                &[&replace.id.0, &replace.name],
            )
            .await?;
        if updated == 0 {
            return Ok(BookWriteResult::MissingBook);
        }

        if let Some(missing) = missing_authors(&transaction, replace.author_ids).await? {
            return Ok(missing);
        }

        transaction
            .execute(
                "DELETE FROM author_book WHERE book_id = $1 AND NOT (author_id = ANY($2))",
                &[&replace.id.0, &author_ids],
            )
            .await?;
        let inserted = transaction
            .execute(INSERT_ASSOCIATIONS, &[&author_ids, &replace.id.0])
            .await;
        if let Some(result) = foreign_key_violation(inserted, replace.author_ids)? {
            return Ok(result);
        }

        transaction.commit().await?;
        debug!(book_id = %replace.id, authors = author_ids.len(), "replaced book authors");

        Ok(BookWriteResult::Written)
    }

    async fn select_by_author(
        &self,
        author_id: &AuthorId,
        after: Option<BookId>,
        limit: usize,
    ) -> AppResult<Vec<BookRecordOwned>> {
        let client = self.pool.get().await?;
        let after = after.map(|id| id.0);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = client
            .query(SELECT_AUTHOR_BOOKS, &[&author_id.0, &after, &limit])
            .await?;
        Ok(rows.iter().map(book_from_row).collect())
    }
}

/// Checks author existence inside the write transaction. `FOR KEY SHARE`
/// only conflicts with key changes, so concurrent inserts referencing the
/// same author do not block each other.
async fn missing_authors(
    transaction: &Transaction<'_>,
    author_ids: &BTreeSet<AuthorId>,
) -> AppResult<Option<BookWriteResult>> {
    let rows = transaction
        .query(
            "SELECT id FROM author WHERE id = ANY($1) FOR KEY SHARE",
            &[&uuids(author_ids)],
        )
        .await?;
    let existing: BTreeSet<_> = rows.iter().map(|row| AuthorId(row.get(0))).collect();
    if existing.len() == author_ids.len() {
        return Ok(None);
    }
    Ok(Some(BookWriteResult::MissingAuthors(
        author_ids.difference(&existing).copied().collect(),
    )))
}

fn foreign_key_violation(
    result: Result<u64, tokio_postgres::Error>,
    author_ids: &BTreeSet<AuthorId>,
) -> AppResult<Option<BookWriteResult>> {
    match result {
        Ok(_) => Ok(None),
        Err(err) if err.code() == Some(&SqlState::FOREIGN_KEY_VIOLATION) => {
            Ok(Some(BookWriteResult::MissingAuthors(author_ids.clone())))
        }
        Err(err) => Err(err.into()),
    }
}

fn uuids(ids: &BTreeSet<AuthorId>) -> Vec<Uuid> {
    ids.iter().map(|id| id.0).collect()
}

fn book_from_row(row: &Row) -> BookRecordOwned {
    let author_ids: Vec<Uuid> = row.get("author_ids");
    BookRecordOwned {
        id: BookId(row.get("id")),
        name: row.get("name"),
        author_ids: author_ids.into_iter().map(AuthorId).collect(),
    }
}
