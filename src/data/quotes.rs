use super::db::{unix_timestamp, Database, StoreError};
use super::models::{NewQuote, Quote, QuoteListRow, QuoteRow};
use crate::query::{Metadata, QuotePlan};

const QUOTE_COLUMNS: &str =
    "id, created_at, modified_at, user_id, content, author, source_title, source_type, tags, version";

fn encode_tags(tags: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(tags).map_err(|e| StoreError::Query(format!("encode tags: {e}")))
}

impl Database {
    pub async fn insert_quote(&self, new: &NewQuote) -> Result<Quote, StoreError> {
        let tags = encode_tags(&new.tags)?;
        self.bounded("insert_quote", async {
            let now = unix_timestamp();
            let row = sqlx::query_as::<_, QuoteRow>(&format!(
                "INSERT INTO quotes (created_at, modified_at, user_id, content, author, source_title, source_type, tags)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                 RETURNING {QUOTE_COLUMNS}"
            ))
            .bind(now)
            .bind(now)
            .bind(new.user_id)
            .bind(&new.content)
            .bind(&new.author)
            .bind(&new.source.title)
            .bind(&new.source.kind)
            .bind(&tags)
            .fetch_one(self.pool())
            .await?;
            Quote::try_from(row)
        })
        .await
    }

    pub async fn get_quote(&self, id: i64) -> Result<Quote, StoreError> {
        self.bounded("get_quote", async {
            let row = sqlx::query_as::<_, QuoteRow>(&format!(
                "SELECT {QUOTE_COLUMNS} FROM quotes WHERE id = ?"
            ))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or(StoreError::NotFound)?;
            Quote::try_from(row)
        })
        .await
    }

    pub async fn quote_exists(&self, id: i64) -> Result<bool, StoreError> {
        self.bounded("quote_exists", async {
            let found: i64 = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM quotes WHERE id = ?)")
                .bind(id)
                .fetch_one(self.pool())
                .await?;
            Ok(found != 0)
        })
        .await
    }

    /// Write `quote` if its stored version is still `expected_version`.
    ///
    /// Returns the new version, or `None` when no row matched both the id
    /// and the version.
    pub async fn update_quote_if_version(
        &self,
        quote: &Quote,
        expected_version: i64,
        modified_at: i64,
    ) -> Result<Option<i64>, StoreError> {
        let tags = encode_tags(&quote.tags)?;
        self.bounded("update_quote", async {
            let version = sqlx::query_scalar::<_, i64>(
                "UPDATE quotes
                 SET content = ?, author = ?, source_title = ?, source_type = ?, tags = ?,
                     modified_at = ?, version = version + 1
                 WHERE id = ? AND version = ?
                 RETURNING version",
            )
            .bind(&quote.content)
            .bind(&quote.author)
            .bind(&quote.source.title)
            .bind(&quote.source.kind)
            .bind(&tags)
            .bind(modified_at)
            .bind(quote.id)
            .bind(expected_version)
            .fetch_optional(self.pool())
            .await?;
            Ok(version)
        })
        .await
    }

    /// One page of quotes matching `plan`, plus metadata for the whole result.
    ///
    /// `owner` narrows the listing to a single user's quotes.
    pub async fn list_quotes(
        &self,
        plan: &QuotePlan,
        owner: Option<i64>,
    ) -> Result<(Vec<Quote>, Metadata), StoreError> {
        let wanted_tags = encode_tags(&plan.tags)?;
        let filters = plan.filters;
        // the sort column comes from a fixed safelist, never from the request
        let sql = format!(
            "SELECT count(*) OVER() AS total_records, {QUOTE_COLUMNS}
             FROM quotes
             WHERE (? IS NULL OR user_id = ?)
               AND (? = '' OR instr(lower(content), lower(?)) > 0)
               AND NOT EXISTS (
                   SELECT 1 FROM json_each(?) AS wanted
                   WHERE wanted.value NOT IN (SELECT value FROM json_each(quotes.tags)))
             ORDER BY {} {}, id ASC
             LIMIT ? OFFSET ?",
            filters.sort.column(),
            filters.sort.direction().as_sql(),
        );

        self.bounded("list_quotes", async {
            let rows = sqlx::query_as::<_, QuoteListRow>(&sql)
                .bind(owner)
                .bind(owner)
                .bind(&plan.content)
                .bind(&plan.content)
                .bind(&wanted_tags)
                .bind(filters.limit())
                .bind(filters.offset())
                .fetch_all(self.pool())
                .await?;

            let total = rows.first().map(|r| r.total_records).unwrap_or(0);
            let quotes = rows
                .into_iter()
                .map(|r| Quote::try_from(r.quote))
                .collect::<Result<Vec<_>, _>>()?;

            Ok((quotes, Metadata::calculate(total, filters.page, filters.page_size)))
        })
        .await
    }
}
