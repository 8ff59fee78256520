use crate::cart::{
    CartError, buyer_key,
    custom::{decode_data_url, store_image},
    models::{CartItem, CartItemPatch, CartSnapshot, CustomItemRequest},
};
use chrono::Utc;
use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
    sync::Arc,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Default)]
struct CartBook {
    carts: BTreeMap<String, Vec<CartItem>>,
    versions: HashMap<String, u64>,
    /// Starting value for every buyer's version counter, taken from the
    /// clock when the store opens so versions keep rising across restarts.
    epoch: u64,
}

impl CartBook {
    fn version(&self, buyer: &str) -> u64 {
        self.versions.get(buyer).copied().unwrap_or(self.epoch)
    }

    fn snapshot(&self, buyer: &str) -> CartSnapshot {
        CartSnapshot {
            items: self.carts.get(buyer).cloned().unwrap_or_default(),
            version: self.version(buyer),
        }
    }

    fn bump(&mut self, buyer: &str) {
        let next = self.version(buyer) + 1;
        self.versions.insert(buyer.to_string(), next);
    }

    fn cart(&self, buyer: &str) -> Vec<CartItem> {
        self.carts.get(buyer).cloned().unwrap_or_default()
    }
}

fn upsert(cart: &mut Vec<CartItem>, model: &str, patch: &CartItemPatch) {
    match cart.iter_mut().find(|item| item.model == model) {
        Some(existing) => existing.apply(patch),
        None => {
            let mut item = CartItem::new(model);
            item.apply(patch);
            cart.push(item);
        }
    }
}

/// Per-buyer carts shared by every device, persisted as one JSON document
/// keyed by buyer.
///
/// Mutations for the same buyer are last-write-wins; the version counter is
/// advisory and only lets clients poll for changes.
#[derive(Clone)]
pub struct CartStore {
    book: Arc<Mutex<CartBook>>,
    path: PathBuf,
    image_dir: PathBuf,
}

impl CartStore {
    /// Opens the cart file, starting empty when it is missing or unreadable.
    pub async fn open(path: PathBuf, image_dir: PathBuf) -> Self {
        let carts = match tokio::fs::read(&path).await {
            Ok(raw) => match serde_json::from_slice::<BTreeMap<String, Vec<CartItem>>>(&raw) {
                Ok(carts) => carts,
                Err(err) => {
                    warn!(target = "showroom.cart", path = %path.display(), error = %err, "cart file unreadable; starting empty");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                warn!(target = "showroom.cart", path = %path.display(), error = %err, "cart file unavailable; starting empty");
                BTreeMap::new()
            }
        };
        info!(target = "showroom.cart", buyers = carts.len(), "carts loaded");
        Self {
            book: Arc::new(Mutex::new(CartBook {
                carts,
                versions: HashMap::new(),
                epoch: Utc::now().timestamp_millis().max(0) as u64,
            })),
            path,
            image_dir,
        }
    }

    pub async fn get(&self, buyer: &str) -> CartSnapshot {
        let buyer = buyer.trim();
        self.book.lock().await.snapshot(buyer)
    }

    pub async fn count(&self, buyer: &str) -> usize {
        let buyer = buyer.trim();
        self.book
            .lock()
            .await
            .carts
            .get(buyer)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub async fn version(&self, buyer: &str) -> u64 {
        let buyer = buyer.trim();
        self.book.lock().await.version(buyer)
    }

    /// Adds an item, or merges the patch into the line with the same model.
    pub async fn add(&self, buyer: &str, patch: CartItemPatch) -> Result<CartSnapshot, CartError> {
        let buyer = buyer_key(buyer)?;
        let model = patch.model.trim().to_string();
        if model.is_empty() {
            return Err(CartError::MissingModel);
        }
        let mut book = self.book.lock().await;
        let mut cart = book.cart(&buyer);
        upsert(&mut cart, &model, &patch);
        self.commit(&mut book, &buyer, cart).await
    }

    pub async fn remove(&self, buyer: &str, model: &str) -> Result<CartSnapshot, CartError> {
        let buyer = buyer_key(buyer)?;
        let model = model.trim();
        if model.is_empty() {
            return Err(CartError::MissingModel);
        }
        let mut book = self.book.lock().await;
        let mut cart = book.cart(&buyer);
        cart.retain(|item| item.model != model);
        self.commit(&mut book, &buyer, cart).await
    }

    pub async fn clear(&self, buyer: &str) -> Result<CartSnapshot, CartError> {
        let buyer = buyer_key(buyer)?;
        let mut book = self.book.lock().await;
        self.commit(&mut book, &buyer, Vec::new()).await
    }

    /// Adds a free-standing item. An attached data-URL image is decoded and
    /// stored before the cart is touched.
    pub async fn add_custom(
        &self,
        buyer: &str,
        request: CustomItemRequest,
    ) -> Result<CartSnapshot, CartError> {
        let buyer = buyer_key(buyer)?;
        let model = request.model.trim().to_string();
        if model.is_empty() {
            return Err(CartError::MissingModel);
        }
        let image = match request.image_base64.as_deref().map(str::trim) {
            Some(data_url) if !data_url.is_empty() => {
                store_image(&self.image_dir, decode_data_url(data_url)?).await?
            }
            _ => String::new(),
        };
        let note = request.note.unwrap_or_default();
        let patch = CartItemPatch {
            model: model.clone(),
            short: Some(note.clone()),
            note: Some(note),
            price: Some(None),
            pvp: Some(None),
            image: Some(image),
            is_custom: Some(true),
        };

        let mut book = self.book.lock().await;
        let mut cart = book.cart(&buyer);
        upsert(&mut cart, &model, &patch);
        let snapshot = self.commit(&mut book, &buyer, cart).await?;
        info!(target = "showroom.cart", buyer = %buyer, model = %model, "custom item added");
        Ok(snapshot)
    }

    /// Installs `cart` for `buyer` and writes the file. The previous cart is
    /// restored when the write fails, and the version only moves on success.
    async fn commit(
        &self,
        book: &mut CartBook,
        buyer: &str,
        cart: Vec<CartItem>,
    ) -> Result<CartSnapshot, CartError> {
        let previous = book.carts.insert(buyer.to_string(), cart);
        if let Err(err) = self.persist(&book.carts).await {
            match previous {
                Some(items) => book.carts.insert(buyer.to_string(), items),
                None => book.carts.remove(buyer),
            };
            warn!(target = "showroom.cart", buyer = %buyer, error = %err, "cart write failed; change discarded");
            return Err(err);
        }
        book.bump(buyer);
        Ok(book.snapshot(buyer))
    }

    async fn persist(&self, carts: &BTreeMap<String, Vec<CartItem>>) -> Result<(), CartError> {
        let body = serde_json::to_vec_pretty(carts).map_err(std::io::Error::other)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
