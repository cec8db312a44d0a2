//! Screen navigation and the order-entry field editor.
//!
//! The navigator never mutates the ledger or any cache itself. Every key it
//! handles may yield a list of [`Command`]s that the application context
//! applies (ledger mutations, cache invalidations, candle refreshes).

use super::error::SpotsimError;
use super::ledger::{Ledger, Order, Side};

/// Keys the state machine reacts to, independent of the terminal backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Enter,
    Backspace,
    Esc,
    Char(char),
}

/// Screen the fullscreen chart returns to when closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    SymbolList,
    Trading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    SymbolList,
    Menu,
    AddSymbol,
    Trading,
    OrderOptions { index: usize },
    OrderEdit { index: usize },
    Fullscreen { from: Origin },
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Update,
    Trading,
    AddCoin,
    DeleteCoin,
    Cancel,
}

impl MenuAction {
    pub const ALL: [MenuAction; 5] = [
        MenuAction::Update,
        MenuAction::Trading,
        MenuAction::AddCoin,
        MenuAction::DeleteCoin,
        MenuAction::Cancel,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuAction::Update => "1. Update",
            MenuAction::Trading => "2. Trading",
            MenuAction::AddCoin => "3. Add Coin",
            MenuAction::DeleteCoin => "4. Delete Coin",
            MenuAction::Cancel => "5. Cancel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    Edit,
    Delete,
    DeleteAll,
    Cancel,
}

impl OrderAction {
    pub const ALL: [OrderAction; 4] = [
        OrderAction::Edit,
        OrderAction::Delete,
        OrderAction::DeleteAll,
        OrderAction::Cancel,
    ];

    pub fn label(self) -> &'static str {
        match self {
            OrderAction::Edit => "Edit order",
            OrderAction::Delete => "Delete order",
            OrderAction::DeleteAll => "Delete all",
            OrderAction::Cancel => "Cancel",
        }
    }
}

/// Side effects requested by a key press.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    PlaceOrder(Order),
    EditOrder { index: usize, order: Order },
    DeleteOrder(usize),
    DeleteAllOrders,
    AddSymbol(String),
    RemoveSymbol(String),
    SymbolChanged(String),
    EnterTrading(String),
    OpenFullscreen(String),
    CloseFullscreen(String),
    RefreshTickers,
    SetStatus(String),
    Quit,
}

pub const FIELD_LABELS: [&str; 5] = [
    "Enter type b/s:",
    "Enter quantity:",
    "Enter price:",
    "Enter TP:",
    "Enter SL:",
];
pub const SUBMIT_LABEL: &str = "ENTER";
pub const SUBMIT_FIELD: usize = 5;

const TYPE_FIELD: usize = 0;
const QUANTITY_FIELD: usize = 1;
const PRICE_FIELD: usize = 2;
const TAKE_PROFIT_FIELD: usize = 3;
const STOP_LOSS_FIELD: usize = 4;

/// Six-slot editor: five text fields plus the submit slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderForm {
    pub fields: [String; 5],
    pub current: usize,
}

impl OrderForm {
    pub fn prefilled(order: &Order) -> Self {
        let optional = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        OrderForm {
            fields: [
                order.side.key().to_string(),
                order.amount.to_string(),
                order.price.to_string(),
                optional(order.take_profit),
                optional(order.stop_loss),
            ],
            current: 0,
        }
    }

    pub fn on_submit(&self) -> bool {
        self.current == SUBMIT_FIELD
    }

    /// Returns `false` when already on the first slot.
    pub fn move_up(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    /// Returns `false` when already on the submit slot.
    pub fn move_down(&mut self) -> bool {
        if self.current >= SUBMIT_FIELD {
            return false;
        }
        self.current += 1;
        true
    }

    pub fn input(&mut self, c: char) {
        match self.current {
            TYPE_FIELD => {
                if c == 'b' || c == 's' {
                    self.fields[TYPE_FIELD] = c.to_string();
                }
            }
            QUANTITY_FIELD..=STOP_LOSS_FIELD => {
                if c.is_ascii_digit() || c == '.' {
                    self.fields[self.current].push(c);
                }
            }
            _ => {}
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.current) {
            field.pop();
        }
    }

    /// Empty every field; the cursor stays where it is.
    pub fn clear(&mut self) {
        self.fields = Default::default();
    }

    /// Type, quantity and price are mandatory.
    pub fn is_complete(&self) -> bool {
        [TYPE_FIELD, QUANTITY_FIELD, PRICE_FIELD]
            .iter()
            .all(|&i| !self.fields[i].trim().is_empty())
    }

    pub fn parse(&self, symbol: &str) -> Result<Order, SpotsimError> {
        let side = Side::from_key(self.fields[TYPE_FIELD].trim()).ok_or_else(|| {
            SpotsimError::InvalidOrder {
                reason: format!("unknown type {:?}", self.fields[TYPE_FIELD]),
            }
        })?;
        let amount = parse_number("quantity", &self.fields[QUANTITY_FIELD])?;
        let price = parse_number("price", &self.fields[PRICE_FIELD])?;
        let mut order = Order::limit(side, amount, price, symbol);
        order.take_profit = parse_optional("TP", &self.fields[TAKE_PROFIT_FIELD])?;
        order.stop_loss = parse_optional("SL", &self.fields[STOP_LOSS_FIELD])?;
        Ok(order)
    }
}

fn parse_number(name: &str, raw: &str) -> Result<f64, SpotsimError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| SpotsimError::InvalidOrder {
            reason: format!("{name} {raw:?}: {e}"),
        })
}

fn parse_optional(name: &str, raw: &str) -> Result<Option<f64>, SpotsimError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_number(name, raw).map(Some)
}

fn wrap_up(index: usize, len: usize) -> usize {
    if index == 0 { len - 1 } else { index - 1 }
}

fn wrap_down(index: usize, len: usize) -> usize {
    (index + 1) % len
}

#[derive(Debug, Clone)]
pub struct Navigator {
    screen: Screen,
    selected: usize,
    menu_highlight: usize,
    options_highlight: usize,
    add_input: String,
    form: OrderForm,
    edit_form: OrderForm,
    order_cursor: usize,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    pub fn new() -> Self {
        Navigator {
            screen: Screen::SymbolList,
            selected: 0,
            menu_highlight: 0,
            options_highlight: 0,
            add_input: String::new(),
            form: OrderForm::default(),
            edit_form: OrderForm::default(),
            order_cursor: 0,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn active_symbol<'a>(&self, ledger: &'a Ledger) -> Option<&'a str> {
        ledger.symbols.get(self.selected).map(String::as_str)
    }

    pub fn menu_highlight(&self) -> usize {
        self.menu_highlight
    }

    pub fn options_highlight(&self) -> usize {
        self.options_highlight
    }

    pub fn add_input(&self) -> &str {
        &self.add_input
    }

    pub fn form(&self) -> &OrderForm {
        &self.form
    }

    pub fn edit_form(&self) -> &OrderForm {
        &self.edit_form
    }

    pub fn order_cursor(&self) -> usize {
        self.order_cursor
    }

    /// Keep the selection and the order cursor inside their lists after the
    /// ledger shrank.
    pub fn clamp(&mut self, ledger: &Ledger) {
        self.selected = self.selected.min(ledger.symbols.len().saturating_sub(1));
        self.order_cursor = self
            .order_cursor
            .min(ledger.open_orders.len().saturating_sub(1));
    }

    pub fn handle_key(&mut self, key: Key, ledger: &Ledger) -> Vec<Command> {
        match self.screen {
            Screen::SymbolList => self.on_symbol_list(key, ledger),
            Screen::Menu => self.on_menu(key, ledger),
            Screen::AddSymbol => self.on_add_symbol(key),
            Screen::Trading => self.on_trading(key, ledger),
            Screen::OrderOptions { index } => self.on_order_options(key, index, ledger),
            Screen::OrderEdit { index } => self.on_order_edit(key, index, ledger),
            Screen::Fullscreen { from } => self.on_fullscreen(key, from, ledger),
            Screen::Exit => Vec::new(),
        }
    }

    fn on_symbol_list(&mut self, key: Key, ledger: &Ledger) -> Vec<Command> {
        let count = ledger.symbols.len();
        match key {
            Key::Up | Key::Down if count > 0 => {
                self.selected = match key {
                    Key::Up => wrap_up(self.selected.min(count - 1), count),
                    _ => wrap_down(self.selected.min(count - 1), count),
                };
                vec![Command::SymbolChanged(ledger.symbols[self.selected].clone())]
            }
            Key::Enter => self.enter_trading(ledger),
            Key::Char('r') | Key::Char('R') => self.open_fullscreen(Origin::SymbolList, ledger),
            Key::Char('c') => {
                self.menu_highlight = 0;
                self.screen = Screen::Menu;
                Vec::new()
            }
            Key::Char('q') => {
                self.screen = Screen::Exit;
                vec![Command::Quit]
            }
            _ => Vec::new(),
        }
    }

    fn on_menu(&mut self, key: Key, ledger: &Ledger) -> Vec<Command> {
        let count = MenuAction::ALL.len();
        match key {
            Key::Up => self.menu_highlight = wrap_up(self.menu_highlight, count),
            Key::Down => self.menu_highlight = wrap_down(self.menu_highlight, count),
            Key::Char('q') | Key::Esc => self.screen = Screen::SymbolList,
            Key::Enter => {
                self.screen = Screen::SymbolList;
                return match MenuAction::ALL[self.menu_highlight] {
                    MenuAction::Update => vec![
                        Command::SetStatus("Updating...".into()),
                        Command::RefreshTickers,
                    ],
                    MenuAction::Trading => self.enter_trading(ledger),
                    MenuAction::AddCoin => {
                        self.add_input.clear();
                        self.screen = Screen::AddSymbol;
                        Vec::new()
                    }
                    MenuAction::DeleteCoin => self
                        .active_symbol(ledger)
                        .map(|s| vec![Command::RemoveSymbol(s.to_string())])
                        .unwrap_or_default(),
                    MenuAction::Cancel => Vec::new(),
                };
            }
            _ => {}
        }
        Vec::new()
    }

    fn on_add_symbol(&mut self, key: Key) -> Vec<Command> {
        match key {
            Key::Char(c) if !c.is_control() => self.add_input.push(c),
            Key::Backspace => {
                self.add_input.pop();
            }
            Key::Esc => {
                self.add_input.clear();
                self.screen = Screen::SymbolList;
            }
            Key::Enter => {
                let input = std::mem::take(&mut self.add_input);
                self.screen = Screen::SymbolList;
                let symbol = input.trim().to_uppercase();
                if !symbol.is_empty() {
                    return vec![Command::AddSymbol(symbol)];
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn on_trading(&mut self, key: Key, ledger: &Ledger) -> Vec<Command> {
        let Some(symbol) = self.active_symbol(ledger) else {
            self.screen = Screen::SymbolList;
            return Vec::new();
        };
        let order_count = ledger.open_orders.len();
        match key {
            Key::Up => {
                if !self.form.move_up() && self.order_cursor > 0 {
                    self.order_cursor -= 1;
                }
            }
            Key::Down => {
                if !self.form.move_down() && self.order_cursor + 1 < order_count {
                    self.order_cursor += 1;
                }
            }
            Key::Backspace => self.form.backspace(),
            Key::Enter if self.form.on_submit() => {
                return submit_form(&mut self.form, symbol, Command::PlaceOrder);
            }
            Key::Char('c') => {
                if self.order_cursor < order_count {
                    self.options_highlight = 0;
                    self.screen = Screen::OrderOptions {
                        index: self.order_cursor,
                    };
                }
            }
            Key::Char('r') | Key::Char('R') => {
                return self.open_fullscreen(Origin::Trading, ledger);
            }
            Key::Char('q') | Key::Esc => self.screen = Screen::SymbolList,
            Key::Char(c) => self.form.input(c),
            _ => {}
        }
        Vec::new()
    }

    fn on_order_options(&mut self, key: Key, index: usize, ledger: &Ledger) -> Vec<Command> {
        let count = OrderAction::ALL.len();
        match key {
            Key::Up => self.options_highlight = wrap_up(self.options_highlight, count),
            Key::Down => self.options_highlight = wrap_down(self.options_highlight, count),
            Key::Char('q') | Key::Esc => self.screen = Screen::Trading,
            Key::Enter => {
                self.screen = Screen::Trading;
                return match OrderAction::ALL[self.options_highlight] {
                    OrderAction::Edit => {
                        if let Some(order) = ledger.open_orders.get(index) {
                            self.edit_form = OrderForm::prefilled(order);
                            self.screen = Screen::OrderEdit { index };
                        }
                        Vec::new()
                    }
                    OrderAction::Delete => vec![Command::DeleteOrder(index)],
                    OrderAction::DeleteAll => vec![Command::DeleteAllOrders],
                    OrderAction::Cancel => Vec::new(),
                };
            }
            _ => {}
        }
        Vec::new()
    }

    fn on_order_edit(&mut self, key: Key, index: usize, ledger: &Ledger) -> Vec<Command> {
        let Some(symbol) = ledger.open_orders.get(index).map(|o| o.symbol.clone()) else {
            self.screen = Screen::Trading;
            return Vec::new();
        };
        match key {
            Key::Up => {
                self.edit_form.move_up();
            }
            Key::Down => {
                self.edit_form.move_down();
            }
            Key::Backspace => self.edit_form.backspace(),
            Key::Enter if self.edit_form.on_submit() => {
                let complete = self.edit_form.is_complete();
                let commands = submit_form(&mut self.edit_form, &symbol, |order| {
                    Command::EditOrder { index, order }
                });
                if complete {
                    self.screen = Screen::Trading;
                }
                return commands;
            }
            Key::Char('q') | Key::Esc => {
                self.edit_form.clear();
                self.screen = Screen::Trading;
            }
            Key::Char(c) => self.edit_form.input(c),
            _ => {}
        }
        Vec::new()
    }

    fn on_fullscreen(&mut self, key: Key, from: Origin, ledger: &Ledger) -> Vec<Command> {
        match key {
            Key::Char('q') | Key::Char('Q') | Key::Esc => {
                self.screen = match from {
                    Origin::SymbolList => Screen::SymbolList,
                    Origin::Trading => Screen::Trading,
                };
                self.active_symbol(ledger)
                    .map(|s| vec![Command::CloseFullscreen(s.to_string())])
                    .unwrap_or_default()
            }
            _ => Vec::new(),
        }
    }

    fn enter_trading(&mut self, ledger: &Ledger) -> Vec<Command> {
        let Some(symbol) = self.active_symbol(ledger) else {
            return Vec::new();
        };
        self.form = OrderForm::default();
        self.order_cursor = 0;
        self.screen = Screen::Trading;
        vec![Command::EnterTrading(symbol.to_string())]
    }

    fn open_fullscreen(&mut self, from: Origin, ledger: &Ledger) -> Vec<Command> {
        let Some(symbol) = self.active_symbol(ledger) else {
            return Vec::new();
        };
        self.screen = Screen::Fullscreen { from };
        vec![Command::OpenFullscreen(symbol.to_string())]
    }
}

/// Validate and parse the form. A complete form is cleared whether or not it
/// parses; an incomplete one is left alone.
fn submit_form(
    form: &mut OrderForm,
    symbol: &str,
    command: impl FnOnce(Order) -> Command,
) -> Vec<Command> {
    if !form.is_complete() {
        return vec![Command::SetStatus("Please fill all fields".into())];
    }
    let parsed = form.parse(symbol);
    form.clear();
    match parsed {
        Ok(order) => vec![command(order)],
        Err(e) => vec![Command::SetStatus(format!("Failed: {e}"))],
    }
}
