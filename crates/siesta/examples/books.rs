// Siesta Example: Books CRUD API
// An in-memory resource exposing list/get/post/put/delete as JSON

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::{json, Value};
use siesta::{
    Api, Config, DeleteSupported, EndpointBuilder, GetSupported, ListSupported, Params,
    PostSupported, PutSupported, StatusCode,
};

struct Books {
    shelf: RwLock<HashMap<String, Value>>,
}

impl Books {
    fn seeded() -> Self {
        let mut shelf = HashMap::new();
        shelf.insert("1".to_string(), json!({ "id": "1", "title": "The Sea-Wolf" }));
        shelf.insert("2".to_string(), json!({ "id": "2", "title": "White Fang" }));
        Self {
            shelf: RwLock::new(shelf),
        }
    }
}

impl ListSupported for Books {
    fn list(&self, _params: &Params) -> (StatusCode, Value) {
        let shelf = self.shelf.read().unwrap();
        let mut books: Vec<Value> = shelf.values().cloned().collect();
        books.sort_by_key(|book| book["id"].as_str().unwrap_or("").to_string());
        (StatusCode::OK, json!(books))
    }
}

impl GetSupported for Books {
    fn get(&self, params: &Params) -> (StatusCode, Value) {
        let id = params.get("id").unwrap_or("");
        match self.shelf.read().unwrap().get(id) {
            Some(book) => (StatusCode::OK, book.clone()),
            None => (StatusCode::NOT_FOUND, json!({ "error": "no such book" })),
        }
    }
}

impl PostSupported for Books {
    fn post(&self, body: Value, params: &Params) -> (StatusCode, Value) {
        let id = params.get("id").unwrap_or("").to_string();
        let mut shelf = self.shelf.write().unwrap();
        if shelf.contains_key(&id) {
            return (StatusCode::CONFLICT, json!({ "error": "book already exists" }));
        }
        shelf.insert(id, body.clone());
        (StatusCode::CREATED, body)
    }
}

impl PutSupported for Books {
    fn put(&self, body: Value, params: &Params) -> (StatusCode, Value) {
        let id = params.get("id").unwrap_or("").to_string();
        self.shelf.write().unwrap().insert(id, body.clone());
        (StatusCode::OK, body)
    }
}

impl DeleteSupported for Books {
    fn delete(&self, params: &Params) -> StatusCode {
        let id = params.get("id").unwrap_or("");
        match self.shelf.write().unwrap().remove(id) {
            Some(_) => StatusCode::NO_CONTENT,
            None => StatusCode::NOT_FOUND,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::load_default().unwrap_or_else(|e| {
        eprintln!("Failed to load config: {}, using defaults", e);
        Config::default()
    });

    let books = Arc::new(Books::seeded());
    let endpoint = EndpointBuilder::new("/books")
        .list(books.clone())?
        .get(books.clone())?
        .post(books.clone())?
        .put(books.clone())?
        .delete(books)?
        .build();

    let mut api = Api::new();
    api.mount(endpoint);

    // curl http://127.0.0.1:3000/books
    // curl http://127.0.0.1:3000/books/1
    // curl -X DELETE http://127.0.0.1:3000/books/2
    api.serve(&config.bind_addr()).await
}
