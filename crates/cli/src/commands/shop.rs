//! Interactive storefront session.
//!
//! Reads one command per line from stdin and keeps the cart, watchlist and
//! open product view alive between commands. Type `help` for the list.

use std::io::{self, Write};

use marketplace_core::{LineUpdate, Product, ProductId};
use marketplace_storefront::api::{ProductQuery, ProfileUpdate};
use marketplace_storefront::{Notice, ProductDetail, Storefront};
use secrecy::SecretString;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::debug;

use super::CommandResult;
use crate::render;

const HELP: &str = "\
Catalog:   list [text] | next | prev | categories | show <id> | bids
Auction:   bid <amount> | countdown [ticks]
Cart:      add <id> [qty] | remove <id> | qty <id> <n> | cart | clear
Watchlist: watch <id> | unwatch <id> | watchlist | sync
Account:   login <email> | register <email> <name...> | logout | profile
           rename <name...> | orders
Other:     help | quit";

const DEFAULT_TICKS: u32 = 5;

enum Flow {
    Continue,
    Quit,
}

struct Shop {
    query: ProductQuery,
    listing: Vec<Product>,
    detail: Option<ProductDetail>,
    input: Lines<BufReader<Stdin>>,
}

pub async fn run(storefront: &mut Storefront, out: &mut impl Write) -> CommandResult {
    let mut shop = Shop {
        query: storefront.query(),
        listing: Vec::new(),
        detail: None,
        input: BufReader::new(tokio::io::stdin()).lines(),
    };

    if let Some(notice) = storefront.refresh_session().await {
        render::notice(out, &notice)?;
    }
    match storefront.user() {
        Some(user) => writeln!(out, "Welcome back, {}.", user.name)?,
        None => writeln!(out, "Welcome. Type 'help' for commands.")?,
    }

    loop {
        write!(out, "mkt> ")?;
        out.flush()?;
        let Some(line) = shop.input.next_line().await? else {
            break;
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            continue;
        };
        debug!(command, "Shop command");
        if matches!(shop.dispatch(storefront, command, args, out).await?, Flow::Quit) {
            break;
        }
    }
    Ok(())
}

impl Shop {
    async fn dispatch(
        &mut self,
        storefront: &mut Storefront,
        command: &str,
        args: &[&str],
        out: &mut impl Write,
    ) -> io::Result<Flow> {
        match command {
            "list" | "search" | "next" | "prev" | "categories" | "show" | "bids" | "bid"
            | "countdown" => self.catalog(storefront, command, args, out).await?,
            "add" | "remove" | "qty" | "cart" | "clear" | "watch" | "unwatch" | "watchlist"
            | "sync" => self.basket(storefront, command, args, out).await?,
            "login" | "register" | "logout" | "profile" | "whoami" | "rename" | "orders" => {
                self.account(storefront, command, args, out).await?;
            }
            "help" | "?" => writeln!(out, "{HELP}")?,
            "quit" | "exit" => return Ok(Flow::Quit),
            other => writeln!(out, "Unknown command '{other}'. Type 'help' for commands.")?,
        }
        Ok(Flow::Continue)
    }

    /// Browsing, product view and bidding.
    async fn catalog(
        &mut self,
        storefront: &mut Storefront,
        command: &str,
        args: &[&str],
        out: &mut impl Write,
    ) -> io::Result<()> {
        match command {
            "list" | "search" => {
                let text = args.join(" ");
                self.query = ProductQuery {
                    text: (!text.is_empty()).then_some(text),
                    ..storefront.query()
                };
                self.list(storefront, out).await?;
            }
            "next" | "prev" => {
                let page = if command == "next" {
                    self.query.page.saturating_add(1)
                } else {
                    self.query.page.saturating_sub(1).max(1)
                };
                if page == self.query.page {
                    writeln!(out, "Already on the first page.")?;
                } else {
                    self.query.page = page;
                    self.list(storefront, out).await?;
                }
            }
            "categories" => {
                let loaded = storefront.categories().await;
                render::categories(out, &loaded.value)?;
                show_notice(out, loaded.notice.as_ref())?;
            }
            "show" => {
                let Some(id) = product_arg(args, out)? else {
                    return Ok(());
                };
                // Drop the previous view first so its countdown stops
                self.detail = None;
                let loaded = storefront.open_product(&id).await;
                if let Some(detail) = &loaded.value {
                    render::detail(out, detail)?;
                }
                show_notice(out, loaded.notice.as_ref())?;
                self.detail = loaded.value;
            }
            "bids" => {
                let Some(detail) = self.open_detail(out)? else {
                    return Ok(());
                };
                let loaded = storefront.bid_history(&detail.product.id).await;
                render::bids(out, &loaded.value)?;
                show_notice(out, loaded.notice.as_ref())?;
            }
            "bid" => {
                if args.is_empty() {
                    writeln!(out, "Usage: bid <amount>")?;
                    return Ok(());
                }
                let Some(detail) = self.detail.as_mut() else {
                    writeln!(out, "Open an auction with 'show <id>' first.")?;
                    return Ok(());
                };
                let notice = storefront.place_bid(detail, &args.join(" ")).await;
                render::notice(out, &notice)?;
            }
            "countdown" => self.countdown(args, out).await?,
            _ => {}
        }
        Ok(())
    }

    /// Cart and watchlist.
    async fn basket(
        &self,
        storefront: &mut Storefront,
        command: &str,
        args: &[&str],
        out: &mut impl Write,
    ) -> io::Result<()> {
        match command {
            "add" => {
                let Some(id) = product_arg(args, out)? else {
                    return Ok(());
                };
                let Some(quantity) = quantity_arg(args.get(1), 1, out)? else {
                    return Ok(());
                };
                if let Some(product) = self.find(storefront, &id, out).await? {
                    let notice = storefront.add_to_cart(&product, quantity);
                    render::notice(out, &notice)?;
                }
            }
            "remove" => {
                let Some(id) = product_arg(args, out)? else {
                    return Ok(());
                };
                match storefront.remove_from_cart(&id) {
                    Some(notice) => render::notice(out, &notice)?,
                    None => writeln!(out, "That item is not in your cart.")?,
                }
            }
            "qty" => {
                let Some(id) = product_arg(args, out)? else {
                    return Ok(());
                };
                let Some(quantity) = quantity_arg(args.get(1), 0, out)? else {
                    return Ok(());
                };
                match storefront.update_quantity(&id, quantity) {
                    LineUpdate::Updated(n) => writeln!(out, "Quantity set to {n}.")?,
                    LineUpdate::Removed => writeln!(out, "Removed from cart.")?,
                    LineUpdate::NotInCart => writeln!(out, "That item is not in your cart.")?,
                }
            }
            "cart" => render::cart(out, storefront.cart(), &storefront.cart_summary())?,
            "clear" => {
                storefront.clear_cart();
                writeln!(out, "Cart cleared.")?;
            }
            "watch" => {
                let Some(id) = product_arg(args, out)? else {
                    return Ok(());
                };
                if let Some(product) = self.find(storefront, &id, out).await? {
                    let notice = storefront.watch(&product).await;
                    render::notice(out, &notice)?;
                }
            }
            "unwatch" => {
                let Some(id) = product_arg(args, out)? else {
                    return Ok(());
                };
                match storefront.unwatch(&id).await {
                    Some(notice) => render::notice(out, &notice)?,
                    None => writeln!(out, "That item is not on your watchlist.")?,
                }
            }
            "watchlist" => render::watchlist(out, storefront.watchlist())?,
            "sync" => match storefront.sync_watchlist().await {
                Some(notice) => render::notice(out, &notice)?,
                None => writeln!(out, "Sign in to sync your watchlist.")?,
            },
            _ => {}
        }
        Ok(())
    }

    /// Sign-in and profile.
    async fn account(
        &mut self,
        storefront: &mut Storefront,
        command: &str,
        args: &[&str],
        out: &mut impl Write,
    ) -> io::Result<()> {
        match command {
            "login" => {
                let [email] = args else {
                    writeln!(out, "Usage: login <email>")?;
                    return Ok(());
                };
                let password = self.password(out).await?;
                let notice = storefront.login(email, &password).await;
                render::notice(out, &notice)?;
            }
            "register" => {
                let Some((email, name)) = args.split_first() else {
                    writeln!(out, "Usage: register <email> <name...>")?;
                    return Ok(());
                };
                let password = self.password(out).await?;
                let notice = storefront.register(&name.join(" "), email, &password).await;
                render::notice(out, &notice)?;
            }
            "logout" => {
                let notice = storefront.logout().await;
                render::notice(out, &notice)?;
            }
            "profile" | "whoami" => {
                let loaded = storefront.profile().await;
                if let Some(user) = &loaded.value {
                    render::user(out, user)?;
                }
                show_notice(out, loaded.notice.as_ref())?;
            }
            "rename" => {
                let update = ProfileUpdate {
                    name: Some(args.join(" ")),
                    avatar: None,
                };
                let notice = storefront.update_profile(&update).await;
                render::notice(out, &notice)?;
            }
            "orders" => {
                let loaded = storefront.orders().await;
                render::orders(out, &loaded.value)?;
                show_notice(out, loaded.notice.as_ref())?;
            }
            _ => {}
        }
        Ok(())
    }

    async fn list(&mut self, storefront: &Storefront, out: &mut impl Write) -> io::Result<()> {
        let loaded = storefront.browse(&self.query).await;
        render::products(out, &loaded.value)?;
        show_notice(out, loaded.notice.as_ref())?;
        self.query.page = loaded.value.current_page;
        self.listing = loaded.value.products;
        Ok(())
    }

    /// Print the next `ticks` countdown values of the open auction.
    async fn countdown(&self, args: &[&str], out: &mut impl Write) -> io::Result<()> {
        let Some(detail) = self.open_detail(out)? else {
            return Ok(());
        };
        let Some(timer) = &detail.countdown else {
            return writeln!(out, "This item has no countdown.");
        };
        let Some(ticks) = quantity_arg(args.first(), DEFAULT_TICKS, out)? else {
            return Ok(());
        };

        writeln!(out, "{}", timer.current())?;
        let mut rx = timer.subscribe();
        for _ in 0..ticks {
            if rx.changed().await.is_err() {
                break;
            }
            let left = *rx.borrow_and_update();
            writeln!(out, "{left}")?;
            out.flush()?;
        }
        Ok(())
    }

    fn open_detail(&self, out: &mut impl Write) -> io::Result<Option<&ProductDetail>> {
        if self.detail.is_none() {
            writeln!(out, "Open a product with 'show <id>' first.")?;
        }
        Ok(self.detail.as_ref())
    }

    /// Look a product up in the open view, the last listing, then the backend.
    async fn find(
        &self,
        storefront: &Storefront,
        id: &ProductId,
        out: &mut impl Write,
    ) -> io::Result<Option<Product>> {
        let known = self
            .detail
            .iter()
            .map(|detail| &detail.product)
            .chain(&self.listing)
            .find(|product| &product.id == id);
        if let Some(product) = known {
            return Ok(Some(product.clone()));
        }

        let loaded = storefront.product(id).await;
        show_notice(out, loaded.notice.as_ref())?;
        Ok(loaded.value)
    }

    async fn password(&mut self, out: &mut impl Write) -> io::Result<SecretString> {
        write!(out, "Password: ")?;
        out.flush()?;
        let line = self.input.next_line().await?.unwrap_or_default();
        Ok(SecretString::from(line))
    }
}

fn show_notice(out: &mut impl Write, notice: Option<&Notice>) -> io::Result<()> {
    notice.map_or(Ok(()), |notice| render::notice(out, notice))
}

fn product_arg(args: &[&str], out: &mut impl Write) -> io::Result<Option<ProductId>> {
    match args.first() {
        Some(id) => Ok(Some(ProductId::new(*id))),
        None => {
            writeln!(out, "Which product? Give its id.")?;
            Ok(None)
        }
    }
}

/// A count argument; negative values read as 0.
fn quantity_arg(
    arg: Option<&&str>,
    default: u32,
    out: &mut impl Write,
) -> io::Result<Option<u32>> {
    let Some(raw) = arg else {
        return Ok(Some(default));
    };
    if let Ok(n) = raw.parse::<i64>() {
        Ok(Some(u32::try_from(n.max(0)).unwrap_or(u32::MAX)))
    } else {
        writeln!(out, "'{raw}' is not a whole number.")?;
        Ok(None)
    }
}
