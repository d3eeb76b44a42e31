//! Library fixture shared by the integration tests.
//!
//! Book belongs to a Publisher and a main Author, has many Pages, and has
//! many Authors / co-authors through the AuthorBook junction.

#![allow(dead_code)]

use relfilter::config::Settings;
use relfilter::Schema;

pub const LIBRARY_SCHEMA: &str = r#"
[entities.Book]
datasource = "db"
properties = ["id", "title", "publisherId", "mainAuthorId"]

[entities.Book.relations.publisher]
kind = "belongs_to"
target = "Publisher"
key_from = "publisherId"
key_to = "id"

[entities.Book.relations.mainAuthor]
kind = "belongs_to"
target = "Author"
key_from = "mainAuthorId"
key_to = "id"

[entities.Book.relations.pages]
kind = "has_many"
target = "Page"
key_from = "id"
key_to = "bookId"

[entities.Book.relations.authors]
kind = "has_many_through"
target = "Author"
through = "AuthorBook"
key_from = "id"
key_to = "bookId"
key_through = "authorId"

[entities.Book.relations.coAuthors]
kind = "has_many_through"
target = "Author"
through = "AuthorBook"
key_from = "id"
key_to = "bookId"
key_through = "authorId"

[entities.Author]
datasource = "db"
properties = ["id", "firstName", "lastName"]

[entities.Author.relations.books]
kind = "has_and_belongs_to_many"
target = "Book"
through = "AuthorBook"
key_from = "id"
key_to = "authorId"
key_through = "bookId"

[entities.Publisher]
datasource = "db"
properties = ["id", "name"]

[entities.Page]
datasource = "db"
properties = ["id", "number", "bookId"]

[entities.AuthorBook]
datasource = "db"
properties = ["bookId", "authorId"]
"#;

pub const POSTGRES_CONFIG: &str = r#"
[datasources.db]
dialect = "postgres"
default_schema = "public"
"#;

pub fn library() -> Schema {
    Schema::from_toml_str(LIBRARY_SCHEMA).expect("library schema is valid")
}

pub fn settings(config: &str) -> Settings {
    Settings::from_toml_str(config).expect("config is valid")
}

pub fn postgres() -> Settings {
    settings(POSTGRES_CONFIG)
}
