//! HTML pages for the books module.
//!
//! Every user-supplied string goes through `escape_html` before it is
//! written into the page.

use crate::utils::escape_html;

use super::forms::{BookForm, FieldErrors, ReviewForm};
use super::models::{BookId, BookWithReviews, Rating};
use super::BOOKS_PATH;

/// Values the listing's filter form is re-populated with.
#[derive(Debug, Default)]
pub struct ListFilterValues<'a> {
    pub genre: &'a str,
    pub rating: &'a str,
}

pub fn book_list(books: &[BookWithReviews], filter: &ListFilterValues<'_>) -> String {
    let mut body = String::new();

    body.push_str(&format!(
        r#"<h1>Books</h1>
<p><a href="{base}/add">Add a book</a></p>
<form method="get" action="{base}" class="filters">
  <label for="genre">Genre</label>
  <input type="text" id="genre" name="genre" value="{genre}">
  <label for="rating">Rating</label>
  {rating}
  <button type="submit">Filter</button>
  <a href="{base}">Clear</a>
</form>
"#,
        base = BOOKS_PATH,
        genre = escape_html(filter.genre),
        rating = rating_select("rating", filter.rating, true),
    ));

    if books.is_empty() {
        body.push_str("<p class=\"empty\">No books found.</p>\n");
        return layout("Books", &body);
    }

    body.push_str("<ul class=\"books\">\n");
    for entry in books {
        let book = &entry.book;
        body.push_str(&format!(
            r#"<li class="book" id="book-{id}">
  <h2>{title}</h2>
  <p>by {author}, published {date} &middot; {genre}</p>
  <p><a href="{base}/{id}/edit">Edit</a> <a href="{base}/{id}/delete">Delete</a></p>
"#,
            id = book.id,
            title = escape_html(&book.title),
            author = escape_html(&book.author),
            date = book.publication_date.format("%Y-%m-%d"),
            genre = escape_html(&book.genre),
            base = BOOKS_PATH,
        ));

        if entry.reviews.is_empty() {
            body.push_str("  <p class=\"no-reviews\">No reviews yet.</p>\n");
        } else {
            body.push_str("  <ul class=\"reviews\">\n");
            for review in &entry.reviews {
                body.push_str(&format!(
                    "    <li class=\"review\"><strong>{name}</strong> rated {rating}/{max}: {text}</li>\n",
                    name = escape_html(&review.reviewer_name),
                    rating = review.rating,
                    max = Rating::MAX,
                    text = escape_html(&review.review_text),
                ));
            }
            body.push_str("  </ul>\n");
        }
        body.push_str("</li>\n");
    }
    body.push_str("</ul>\n");

    layout("Books", &body)
}

pub fn add_book(
    book: &BookForm,
    book_errors: &FieldErrors,
    review: &ReviewForm,
    review_errors: &FieldErrors,
) -> String {
    let body = format!(
        r#"<h1>Add a book</h1>
<form method="post" action="{base}/add">
  <fieldset>
    <legend>Book</legend>
{book_fields}  </fieldset>
  <fieldset>
    <legend>Review</legend>
{review_fields}  </fieldset>
  <button type="submit">Save</button>
  <a href="{base}">Cancel</a>
</form>
"#,
        base = BOOKS_PATH,
        book_fields = book_fields(book, book_errors),
        review_fields = review_fields(review, review_errors),
    );
    layout("Add a book", &body)
}

pub fn edit_book(id: BookId, form: &BookForm, errors: &FieldErrors) -> String {
    let body = format!(
        r#"<h1>Edit {title}</h1>
<form method="post" action="{base}/{id}/edit">
{fields}  <button type="submit">Save</button>
  <a href="{base}">Cancel</a>
</form>
"#,
        title = escape_html(&form.title),
        base = BOOKS_PATH,
        id = id,
        fields = book_fields(form, errors),
    );
    layout("Edit book", &body)
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} &middot; Shelf</title>
</head>
<body>
{body}</body>
</html>
"#,
        title = escape_html(title),
        body = body,
    )
}

fn book_fields(form: &BookForm, errors: &FieldErrors) -> String {
    [
        input("title", "Title", "text", &form.title, errors),
        input("author", "Author", "text", &form.author, errors),
        input(
            "publication_date",
            "Publication date",
            "date",
            &form.publication_date,
            errors,
        ),
        input("genre", "Genre", "text", &form.genre, errors),
    ]
    .concat()
}

fn review_fields(form: &ReviewForm, errors: &FieldErrors) -> String {
    let rating = format!(
        "    <p>\n      <label for=\"rating\">Rating</label>\n      {select}\n{errors}    </p>\n",
        select = rating_select("rating", &form.rating, false),
        errors = error_list(errors.get("rating")),
    );
    let text = format!(
        "    <p>\n      <label for=\"review_text\">Review</label>\n      <textarea id=\"review_text\" name=\"review_text\">{value}</textarea>\n{errors}    </p>\n",
        value = escape_html(&form.review_text),
        errors = error_list(errors.get("review_text")),
    );

    [
        input(
            "reviewer_name",
            "Reviewer name",
            "text",
            &form.reviewer_name,
            errors,
        ),
        rating,
        text,
    ]
    .concat()
}

fn input(name: &str, label: &str, kind: &str, value: &str, errors: &FieldErrors) -> String {
    format!(
        "    <p>\n      <label for=\"{name}\">{label}</label>\n      <input type=\"{kind}\" id=\"{name}\" name=\"{name}\" value=\"{value}\">\n{errors}    </p>\n",
        name = name,
        label = label,
        kind = kind,
        value = escape_html(value),
        errors = error_list(errors.get(name)),
    )
}

/// `<select>` over 1..=5. `any` adds a blank "Any" option for filtering.
fn rating_select(name: &str, selected: &str, any: bool) -> String {
    let selected = selected.trim();
    let mut html = format!("<select id=\"{0}\" name=\"{0}\">", name);

    let blank = if any { "Any" } else { "---------" };
    html.push_str(&format!("<option value=\"\">{}</option>", blank));

    for rating in Rating::all() {
        let value = rating.to_string();
        let mark = if value == selected { " selected" } else { "" };
        html.push_str(&format!(
            "<option value=\"{value}\"{mark}>{value}</option>",
            value = value,
            mark = mark
        ));
    }

    html.push_str("</select>");
    html
}

fn error_list(messages: &[String]) -> String {
    if messages.is_empty() {
        return String::new();
    }

    let items: String = messages
        .iter()
        .map(|m| format!("<li>{}</li>", escape_html(m)))
        .collect();
    format!("      <ul class=\"errorlist\">{}</ul>\n", items)
}
