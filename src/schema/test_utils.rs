//! Library schema shared by unit tests.
//!
//! Book has a publisher (belongs-to), pages (has-many), a main author
//! (belongs-to) and authors / co-authors (many-to-many through AuthorBook).

use super::{EntityDescriptor, RelationDescriptor, Schema};
use crate::config::{DatasourceSettings, Settings};
use crate::sql::Dialect;

pub fn library() -> Schema {
    Schema::new()
        .with_entity(
            EntityDescriptor::new("Book")
                .with_datasource("db")
                .with_properties(["id", "title", "publisherId", "mainAuthorId"])
                .with_relation(RelationDescriptor::direct(
                    "publisher",
                    "Publisher",
                    "publisherId",
                    "id",
                ))
                .with_relation(RelationDescriptor::direct(
                    "mainAuthor",
                    "Author",
                    "mainAuthorId",
                    "id",
                ))
                .with_relation(RelationDescriptor::direct("pages", "Page", "id", "bookId"))
                .with_relation(RelationDescriptor::through(
                    "authors",
                    "Author",
                    "AuthorBook",
                    "id",
                    "bookId",
                    "authorId",
                ))
                .with_relation(RelationDescriptor::through(
                    "coAuthors",
                    "Author",
                    "AuthorBook",
                    "id",
                    "bookId",
                    "authorId",
                )),
        )
        .with_entity(
            EntityDescriptor::new("Author")
                .with_datasource("db")
                .with_properties(["id", "firstName", "lastName"])
                .with_relation(RelationDescriptor::through(
                    "books",
                    "Book",
                    "AuthorBook",
                    "id",
                    "authorId",
                    "bookId",
                )),
        )
        .with_entity(
            EntityDescriptor::new("Publisher")
                .with_datasource("db")
                .with_properties(["id", "name"]),
        )
        .with_entity(
            EntityDescriptor::new("Page")
                .with_datasource("db")
                .with_properties(["id", "number", "bookId"]),
        )
        .with_entity(
            EntityDescriptor::new("AuthorBook")
                .with_datasource("db")
                .with_properties(["bookId", "authorId"]),
        )
}

pub fn postgres() -> Settings {
    Settings::default().with_datasource(
        "db",
        DatasourceSettings::new(Dialect::Postgres).with_default_schema("public"),
    )
}
